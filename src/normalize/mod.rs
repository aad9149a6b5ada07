//! Geometry normalization: one raw layer in, one clean record set out.
//!
//! Order matters and is part of the contract: reproject, drop unusable codes,
//! drop non-polygonal geometries, drop invalid geometries, then dedupe by
//! code keeping the first occurrence. The whole pass is a pure function of
//! its input, so running it twice on the same raw layer yields identical
//! output.

mod reproject;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use geo::{MultiPolygon, Validation};

use crate::layer::{RawGeometry, RawLayer};
use crate::model::{AdminLevel, AdministrativeBoundary, CountryCode, Pcode};
use crate::schema::ResolvedSchema;

pub use reproject::{reproject_multipolygon, STORAGE_EPSG};

/// Code values that mean "no code": stringified nulls from upstream tooling.
const PLACEHOLDER_CODES: [&str; 3] = ["none", "null", "nan"];

/// One cleaned boundary record, not yet bound to a country.
#[derive(Debug, Clone)]
pub struct NormalizedBoundary {
    pub admin_pcode: Pcode,
    pub name: Option<Arc<str>>,
    pub parent_pcode: Option<Pcode>,
    /// Always in the storage CRS (EPSG:4326).
    pub geometry: MultiPolygon<f64>,
}

impl NormalizedBoundary {
    /// Bind the record to a country and level for the store, recording where
    /// it came from.
    pub fn into_boundary(
        self,
        country: &CountryCode,
        level: AdminLevel,
        source_layer: &str,
    ) -> AdministrativeBoundary {
        let mut source = BTreeMap::new();
        source.insert("source_layer".to_string(), source_layer.to_string());
        AdministrativeBoundary {
            country: country.clone(),
            admin_pcode: self.admin_pcode,
            admin_level: level,
            name: self.name,
            parent_pcode: self.parent_pcode,
            geometry: self.geometry,
            source,
        }
    }
}

/// Per-layer accounting of what the normalizer dropped and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub input: usize,
    pub kept: usize,
    pub missing_code: usize,
    pub non_polygonal: usize,
    pub invalid_geometry: usize,
    pub duplicate_code: usize,
}

/// Normalize one raw layer using its resolved schema.
///
/// Errors only when the schema has no code column (fatal-to-layer; the caller
/// skips the layer). Data-quality problems are dropped rows, counted in the
/// report.
pub fn normalize_layer(
    layer: &RawLayer,
    schema: &ResolvedSchema,
    verbose: u8,
) -> Result<(Vec<NormalizedBoundary>, NormalizeReport)> {
    let Some(pcode_column) = schema.pcode.as_deref() else {
        bail!(
            "Layer {:?} has no resolvable code column (columns: {:?})",
            layer.name,
            layer.columns
        );
    };
    let name_column = schema.name.as_deref();
    let parent_column = schema.parent_pcode.as_deref();

    let mut report = NormalizeReport { input: layer.features.len(), ..Default::default() };
    let mut seen: HashSet<Pcode> = HashSet::new();
    let mut records = Vec::with_capacity(layer.features.len());

    for feature in &layer.features {
        // (2) unusable code values
        let code = match feature.text(pcode_column) {
            Some(code) if !code.is_empty() && !is_placeholder(&code) => code,
            _ => {
                report.missing_code += 1;
                continue;
            }
        };

        // (3) absent or non-polygonal geometry
        let geometry = match &feature.geometry {
            Some(RawGeometry::Polygonal(mp)) => mp,
            Some(RawGeometry::NonPolygonal(_)) | None => {
                report.non_polygonal += 1;
                continue;
            }
        };

        // (1) reproject into the storage CRS. A layer without a declared CRS
        // is taken to already be in it, matching publisher practice.
        let geometry = match layer.epsg {
            Some(epsg) if epsg != STORAGE_EPSG => reproject_multipolygon(geometry, epsg)?,
            _ => geometry.clone(),
        };

        // (4) invalid geometry
        if !geometry.is_valid() {
            report.invalid_geometry += 1;
            continue;
        }

        // (5) dedupe by code, first occurrence wins
        let pcode = Pcode::new(&code);
        if !seen.insert(pcode.clone()) {
            report.duplicate_code += 1;
            continue;
        }

        // Display name falls back to the code itself.
        let name: Arc<str> = name_column
            .and_then(|col| feature.text(col))
            .filter(|n| !n.is_empty() && !is_placeholder(n))
            .map(Arc::from)
            .unwrap_or_else(|| Arc::from(code.as_str()));

        let parent_pcode = parent_column
            .and_then(|col| feature.text(col))
            .filter(|p| !p.is_empty() && !is_placeholder(p))
            .map(|p| Pcode::new(&p));

        records.push(NormalizedBoundary {
            admin_pcode: pcode,
            name: Some(name),
            parent_pcode,
            geometry,
        });
    }

    report.kept = records.len();
    if verbose > 0 {
        eprintln!(
            "[normalize] {} {}: kept {}/{} (no code: {}, non-polygon: {}, invalid: {}, duplicate: {})",
            layer.name,
            schema.admin_level,
            report.kept,
            report.input,
            report.missing_code,
            report.non_polygonal,
            report.invalid_geometry,
            report.duplicate_code,
        );
    }

    Ok((records, report))
}

fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_CODES.iter().any(|p| text.eq_ignore_ascii_case(p))
}
