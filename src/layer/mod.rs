//! Raw source layers: attribute rows plus geometries, exactly as published.
//!
//! Readers make no attempt to interpret columns; that is the schema
//! resolver's job. Geometries are kept as-read (including non-polygonal
//! ones) so the normalizer can count what it drops.

mod geojson;
mod shp;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geo::MultiPolygon;

use crate::model::AdminLevel;
use crate::schema::detect_level_token;

/// One attribute value as read from the source, untyped beyond the obvious.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Null,
}

impl AttrValue {
    /// Render the value as text, `None` for nulls.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttrValue::Text(text) => Some(text.clone()),
            // Integral numbers print without a trailing ".0" so codes read
            // from numeric columns keep their usual form.
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            AttrValue::Number(n) => Some(n.to_string()),
            AttrValue::Null => None,
        }
    }
}

/// Geometry as read, before any filtering.
#[derive(Debug, Clone)]
pub enum RawGeometry {
    /// Polygon or MultiPolygon, already merged into one MultiPolygon.
    Polygonal(MultiPolygon<f64>),
    /// Point, line, or any other unusable type; the tag is kept for logs.
    NonPolygonal(&'static str),
}

/// One source feature: attributes plus optional geometry.
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub attrs: HashMap<String, AttrValue>,
    pub geometry: Option<RawGeometry>,
}

impl RawFeature {
    /// Attribute as text, trimmed; `None` for missing or null.
    pub fn text(&self, column: &str) -> Option<String> {
        self.attrs
            .get(column)
            .and_then(AttrValue::as_text)
            .map(|s| s.trim().to_string())
    }
}

/// One source layer: feature collection plus whatever CRS information the
/// file carried. `epsg: None` means the source declared nothing; the
/// normalizer then assumes the storage CRS, matching common publisher
/// behavior.
#[derive(Debug, Clone)]
pub struct RawLayer {
    /// Identifying name (file stem), used for level detection and provenance.
    pub name: String,
    pub epsg: Option<u32>,
    /// Column names in order of first appearance.
    pub columns: Vec<String>,
    pub features: Vec<RawFeature>,
}

impl RawLayer {
    /// Read a layer from a file, dispatching on extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "geojson" | "json" => geojson::read_geojson_layer(path),
            "shp" => shp::read_shapefile_layer(path),
            other => anyhow::bail!(
                "Unsupported layer format {:?}: {}",
                other,
                path.display()
            ),
        }
    }

    /// Sample up to `limit` non-empty values from the first code-like column,
    /// for the level-length heuristic. Best effort; empty when no column
    /// looks like a code.
    pub fn sample_codes(&self, limit: usize) -> Vec<String> {
        let column = self.columns.iter().find(|c| {
            let lower = c.to_ascii_lowercase();
            lower.contains("pcode") || lower.contains("pcod")
        });
        let Some(column) = column else { return Vec::new() };

        self.features
            .iter()
            .filter_map(|f| f.text(column))
            .filter(|code| !code.is_empty())
            .take(limit)
            .collect()
    }
}

/// Find per-level boundary files in an extracted archive directory.
///
/// Returns `(level, path)` pairs sorted by level, recognizing names like
/// `bgd_admin3.geojson` or `moz_adm2.shp`. Files without a level token are
/// ignored; the caller can still read them individually and rely on the
/// code-length heuristic.
pub fn discover_level_files(dir: &Path) -> Result<Vec<(AdminLevel, PathBuf)>> {
    let mut found: Vec<(AdminLevel, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some("geojson") | Some("json") | Some("shp")) {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(level) = detect_level_token(stem) {
            found.push((level, path));
        }
    }

    found.sort_by_key(|(level, path)| (*level, path.clone()));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_text_renders_codes_without_decimal_tail() {
        assert_eq!(AttrValue::Number(4005.0).as_text().as_deref(), Some("4005"));
        assert_eq!(AttrValue::Number(12.5).as_text().as_deref(), Some("12.5"));
        assert_eq!(AttrValue::Text("BD40".into()).as_text().as_deref(), Some("BD40"));
        assert_eq!(AttrValue::Null.as_text(), None);
    }

    #[test]
    fn sample_codes_prefers_pcode_like_columns() {
        let layer = RawLayer {
            name: "test".into(),
            epsg: None,
            columns: vec!["NAME".into(), "ADM2_PCODE".into()],
            features: vec![
                RawFeature {
                    attrs: [
                        ("NAME".to_string(), AttrValue::Text("Dhaka".into())),
                        ("ADM2_PCODE".to_string(), AttrValue::Text("BD4026".into())),
                    ]
                    .into_iter()
                    .collect(),
                    geometry: None,
                },
                RawFeature { attrs: HashMap::new(), geometry: None },
            ],
        };
        assert_eq!(layer.sample_codes(10), vec!["BD4026".to_string()]);
    }

    #[test]
    fn discover_finds_level_tagged_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["bgd_admin0.geojson", "bgd_admin2.geojson", "readme.txt", "roads.geojson"] {
            std::fs::write(dir.path().join(name), b"{}").unwrap();
        }
        let files = discover_level_files(dir.path()).unwrap();
        let levels: Vec<AdminLevel> = files.iter().map(|(level, _)| *level).collect();
        assert_eq!(levels, vec![AdminLevel::Adm0, AdminLevel::Adm2]);
    }
}
