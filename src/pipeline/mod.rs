//! The import pipeline for one country: resolve each layer's schema,
//! normalize, validate the hierarchy across levels, then write level by
//! level in ascending order.
//!
//! Sequential by design. Levels must go parents-first because hierarchy
//! validation for level N reads level N-1 from the same run; countries own
//! disjoint store partitions and can run in separate processes. Concurrent
//! imports of the same country are not safe against `clear_existing` and
//! must be serialized by the caller.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Result;

use crate::hierarchy::{validate_hierarchy, HierarchyReport};
use crate::layer::{discover_level_files, RawLayer};
use crate::model::{AdminLevel, AdministrativeBoundary, CountryCode, CountryProfile, Pcode};
use crate::normalize::{normalize_layer, NormalizeReport};
use crate::schema::resolve_schema;
use crate::store::{BoundaryStore, Upserter, UpsertOutcome, DEFAULT_BATCH_SIZE};

/// Number of code values sampled per layer for level inference.
const CODE_SAMPLE_SIZE: usize = 25;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Wipe each `(country, level)` before writing its new set.
    pub clear_existing: bool,
    pub batch_size: usize,
    pub verbose: u8,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { clear_existing: true, batch_size: DEFAULT_BATCH_SIZE, verbose: 0 }
    }
}

/// What happened to one admin level during an import.
#[derive(Debug, Clone, Default)]
pub struct LevelImport {
    pub normalize: NormalizeReport,
    pub upsert: UpsertOutcome,
}

/// Full outcome of one country import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub country: CountryCode,
    pub levels: BTreeMap<AdminLevel, LevelImport>,
    pub hierarchy: HierarchyReport,
    /// Layers skipped as fatal-to-layer: unreadable file, no resolvable code
    /// column, or a source CRS we cannot reproject from.
    pub skipped_layers: Vec<String>,
}

/// Import every recognizable boundary file in a directory for one country.
pub fn import_country_dir<S: BoundaryStore>(
    store: &mut S,
    profile: &CountryProfile,
    dir: &Path,
    opts: &ImportOptions,
) -> Result<ImportReport> {
    let mut layers = Vec::new();
    let mut unreadable = Vec::new();
    for (_, path) in discover_level_files(dir)? {
        match RawLayer::from_path(&path) {
            Ok(layer) => layers.push(layer),
            // Unreadable file: fatal to the layer, not to the run.
            Err(err) => {
                eprintln!(
                    "[import] {}: skipping unreadable layer {}: {err:#}",
                    profile.iso_code,
                    path.display()
                );
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unreadable")
                    .to_string();
                unreadable.push(name);
            }
        }
    }
    let mut report = import_country(store, profile, &layers, opts)?;
    report.skipped_layers.extend(unreadable);
    Ok(report)
}

/// Import a set of already-read layers for one country.
///
/// Data-quality problems never abort the run: layers that cannot be resolved
/// or normalized are skipped and reported, hierarchy findings are advisory,
/// and failed write batches are counted by the upserter.
pub fn import_country<S: BoundaryStore>(
    store: &mut S,
    profile: &CountryProfile,
    layers: &[RawLayer],
    opts: &ImportOptions,
) -> Result<ImportReport> {
    let country = CountryCode::new(&profile.iso_code);

    let mut per_level: BTreeMap<AdminLevel, Vec<AdministrativeBoundary>> = BTreeMap::new();
    let mut per_level_seen: BTreeMap<AdminLevel, HashSet<Pcode>> = BTreeMap::new();
    let mut normalize_reports: BTreeMap<AdminLevel, NormalizeReport> = BTreeMap::new();
    let mut skipped_layers = Vec::new();

    for layer in layers {
        let samples = layer.sample_codes(CODE_SAMPLE_SIZE);
        let schema = resolve_schema(&layer.columns, Some(&layer.name), None, &samples);
        if !schema.pcode.is_resolved() {
            eprintln!(
                "[import] {}: skipping layer {:?}: no code column among {:?}",
                country, layer.name, layer.columns
            );
            skipped_layers.push(layer.name.clone());
            continue;
        }

        // Normalization errors (e.g. an unsupported source CRS) are fatal to
        // the layer only.
        let (records, report) = match normalize_layer(layer, &schema, opts.verbose) {
            Ok(result) => result,
            Err(err) => {
                eprintln!(
                    "[import] {}: skipping layer {:?}: {err:#}",
                    country, layer.name
                );
                skipped_layers.push(layer.name.clone());
                continue;
            }
        };
        let level = schema.admin_level;

        // Several layers can land on the same level (e.g. a shapefile and a
        // corrected GeoJSON); first occurrence wins, same as within a layer.
        let seen = per_level_seen.entry(level).or_default();
        let bucket = per_level.entry(level).or_default();
        let mut merged = report;
        for record in records {
            if seen.insert(record.admin_pcode.clone()) {
                bucket.push(record.into_boundary(&country, level, &layer.name));
            } else {
                merged.kept -= 1;
                merged.duplicate_code += 1;
            }
        }

        let combined = normalize_reports.entry(level).or_default();
        combined.input += merged.input;
        combined.kept += merged.kept;
        combined.missing_code += merged.missing_code;
        combined.non_polygonal += merged.non_polygonal;
        combined.invalid_geometry += merged.invalid_geometry;
        combined.duplicate_code += merged.duplicate_code;
    }

    let hierarchy = validate_hierarchy(&per_level, Some(profile));
    if opts.verbose > 0 {
        for issue in &hierarchy.issues {
            eprintln!("[import] {country}: {issue}");
        }
    }

    let mut levels = BTreeMap::new();
    for (level, records) in &per_level {
        let upsert = Upserter::new(store)
            .with_batch_size(opts.batch_size)
            .with_verbose(opts.verbose)
            .upsert_level(&country, *level, records, opts.clear_existing)?;
        levels.insert(
            *level,
            LevelImport {
                normalize: normalize_reports.remove(level).unwrap_or_default(),
                upsert,
            },
        );
    }

    Ok(ImportReport { country, levels, hierarchy, skipped_layers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use geo::{Coord, LineString, MultiPolygon, Polygon};

    use crate::layer::{AttrValue, RawFeature, RawGeometry};
    use crate::store::MemoryStore;

    fn profile() -> CountryProfile {
        CountryProfile {
            iso_code: "BGD".into(),
            name: "Bangladesh".into(),
            dataset_id: "cod-ab-bgd".into(),
            expected_counts: [(AdminLevel::Adm1, Some(2))].into_iter().collect(),
        }
    }

    fn square(offset: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString(vec![
                Coord { x: offset, y: 0.0 },
                Coord { x: offset + 1.0, y: 0.0 },
                Coord { x: offset + 1.0, y: 1.0 },
                Coord { x: offset, y: 1.0 },
                Coord { x: offset, y: 0.0 },
            ]),
            vec![],
        )])
    }

    fn feature(pairs: &[(&str, &str)], offset: f64) -> RawFeature {
        let attrs: HashMap<String, AttrValue> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::Text(v.to_string())))
            .collect();
        RawFeature { attrs, geometry: Some(RawGeometry::Polygonal(square(offset))) }
    }

    fn adm0_layer() -> RawLayer {
        RawLayer {
            name: "bgd_admin0".into(),
            epsg: Some(4326),
            columns: vec!["ADM0_PCODE".into(), "ADM0_EN".into()],
            features: vec![feature(&[("ADM0_PCODE", "BD"), ("ADM0_EN", "Bangladesh")], 0.0)],
        }
    }

    fn adm1_layer() -> RawLayer {
        RawLayer {
            name: "bgd_admin1".into(),
            epsg: Some(4326),
            columns: vec!["ADM1_PCODE".into(), "ADM1_EN".into(), "ADM0_PCODE".into()],
            features: vec![
                feature(&[("ADM1_PCODE", "BD10"), ("ADM1_EN", "Barisal"), ("ADM0_PCODE", "BD")], 2.0),
                feature(&[("ADM1_PCODE", "BD20"), ("ADM1_EN", "Chittagong"), ("ADM0_PCODE", "XX")], 4.0),
            ],
        }
    }

    #[test]
    fn imports_levels_in_order_with_hierarchy_stats() {
        let mut store = MemoryStore::new();
        let report = import_country(
            &mut store,
            &profile(),
            &[adm1_layer(), adm0_layer()],
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.country, CountryCode::new("BGD"));
        assert_eq!(report.levels[&AdminLevel::Adm0].upsert.inserted, 1);
        assert_eq!(report.levels[&AdminLevel::Adm1].upsert.inserted, 2);

        // One ADM1 parent link does not resolve.
        let adm1 = &report.hierarchy.levels[&AdminLevel::Adm1];
        assert_eq!(adm1.valid_parents, 1);
        assert_eq!(adm1.orphans, 1);

        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm1).unwrap(), 2);
        let stored = store
            .get(&CountryCode::new("BGD"), &Pcode::new("BD10"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.source.get("source_layer").map(String::as_str), Some("bgd_admin1"));
    }

    #[test]
    fn unresolvable_layers_are_skipped_not_fatal() {
        let mut store = MemoryStore::new();
        let mystery = RawLayer {
            name: "bgd_admin2_broken".into(),
            epsg: None,
            columns: vec!["Shape_Area".into()],
            features: vec![],
        };
        let report = import_country(
            &mut store,
            &profile(),
            &[adm0_layer(), mystery],
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.skipped_layers, vec!["bgd_admin2_broken".to_string()]);
        assert_eq!(report.levels[&AdminLevel::Adm0].upsert.inserted, 1);
    }

    #[test]
    fn unsupported_crs_layer_is_skipped_not_fatal() {
        let mut store = MemoryStore::new();
        // British National Grid is not a CRS we can reproject from.
        let mut osgb = adm1_layer();
        osgb.epsg = Some(27700);

        let report = import_country(
            &mut store,
            &profile(),
            &[adm0_layer(), osgb],
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.skipped_layers, vec!["bgd_admin1".to_string()]);
        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm0).unwrap(), 1);
        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm1).unwrap(), 0);
    }

    #[test]
    fn unreadable_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bgd_admin0.geojson"),
            r#"{
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {"ADM0_PCODE": "BD", "ADM0_EN": "Bangladesh"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[88.0, 21.0], [92.0, 21.0], [92.0, 26.0], [88.0, 21.0]]]
                    }
                }]
            }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bgd_admin1.geojson"), b"not json at all").unwrap();

        let mut store = MemoryStore::new();
        let report = import_country_dir(
            &mut store,
            &profile(),
            dir.path(),
            &ImportOptions::default(),
        )
        .unwrap();

        assert!(report.skipped_layers.contains(&"bgd_admin1".to_string()));
        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm0).unwrap(), 1);
    }

    #[test]
    fn reimport_with_clear_replaces_the_level() {
        let mut store = MemoryStore::new();
        let opts = ImportOptions::default();
        import_country(&mut store, &profile(), &[adm1_layer()], &opts).unwrap();

        // Second run ships a smaller corrected set.
        let corrected = RawLayer {
            features: adm1_layer().features[..1].to_vec(),
            ..adm1_layer()
        };
        import_country(&mut store, &profile(), &[corrected], &opts).unwrap();

        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm1).unwrap(), 1);
        assert!(store
            .get(&CountryCode::new("BGD"), &Pcode::new("BD20"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_codes_across_layers_keep_the_first() {
        let mut store = MemoryStore::new();
        let mut second = adm1_layer();
        second.name = "bgd_admin1_extra".into();
        second.features = vec![feature(
            &[("ADM1_PCODE", "BD10"), ("ADM1_EN", "Renamed"), ("ADM0_PCODE", "BD")],
            6.0,
        )];

        let report = import_country(
            &mut store,
            &profile(),
            &[adm1_layer(), second],
            &ImportOptions::default(),
        )
        .unwrap();

        let adm1 = &report.levels[&AdminLevel::Adm1];
        assert_eq!(adm1.normalize.kept, 2);
        assert_eq!(adm1.normalize.duplicate_code, 1);
        let stored = store
            .get(&CountryCode::new("BGD"), &Pcode::new("BD10"))
            .unwrap()
            .unwrap();
        assert_eq!(stored.name.as_deref(), Some("Barisal"));
    }

    #[test]
    fn expected_count_mismatch_is_reported_not_fatal() {
        let mut store = MemoryStore::new();
        let mut one_unit = adm1_layer();
        one_unit.features.truncate(1);
        let report =
            import_country(&mut store, &profile(), &[one_unit], &ImportOptions::default()).unwrap();

        assert!(report
            .hierarchy
            .issues
            .iter()
            .any(|i| i.contains("1 features, expected 2")));
        assert_eq!(store.count(&CountryCode::new("BGD"), AdminLevel::Adm1).unwrap(), 1);
    }
}
