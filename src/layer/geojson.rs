use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

use super::{AttrValue, RawFeature, RawGeometry, RawLayer};

/// Read a GeoJSON FeatureCollection into a raw layer.
pub(super) fn read_geojson_layer(path: &Path) -> Result<RawLayer> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("geojson")
        .to_string();
    read_geojson_bytes(&bytes, &name)
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))
}

/// Parse GeoJSON bytes. GeoJSON is WGS84 by specification, but legacy files
/// still carry a `crs` member; honor it when present.
pub(super) fn read_geojson_bytes(bytes: &[u8], name: &str) -> Result<RawLayer> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;

    let epsg = parse_crs_member(&value);

    let features_json = value["features"]
        .as_array()
        .ok_or_else(|| anyhow!("GeoJSON has no features array"))?;

    let mut columns: Vec<String> = Vec::new();
    let mut features = Vec::with_capacity(features_json.len());

    for feature in features_json {
        let mut attrs = HashMap::new();
        if let Some(properties) = feature["properties"].as_object() {
            for (key, prop) in properties {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
                attrs.insert(key.clone(), parse_property(prop));
            }
        }
        let geometry = parse_geometry(&feature["geometry"])?;
        features.push(RawFeature { attrs, geometry });
    }

    Ok(RawLayer { name: name.to_string(), epsg, columns, features })
}

fn parse_property(value: &Value) -> AttrValue {
    match value {
        Value::String(text) => AttrValue::Text(text.clone()),
        Value::Number(n) => n.as_f64().map(AttrValue::Number).unwrap_or(AttrValue::Null),
        Value::Bool(flag) => AttrValue::Text(flag.to_string()),
        Value::Null => AttrValue::Null,
        other => AttrValue::Text(other.to_string()),
    }
}

/// Legacy `"crs": {"properties": {"name": "...EPSG::4326"}}` member.
fn parse_crs_member(value: &Value) -> Option<u32> {
    let name = value["crs"]["properties"]["name"].as_str()?;
    let code = name.rsplit([':', '#']).next()?;
    code.parse().ok()
}

fn parse_geometry(value: &Value) -> Result<Option<RawGeometry>> {
    let Some(kind) = value["type"].as_str() else {
        return Ok(None);
    };
    match kind {
        "Polygon" => {
            let rings = value["coordinates"]
                .as_array()
                .ok_or_else(|| anyhow!("Polygon has no coordinates"))?;
            let polygon = parse_polygon_rings(rings)?;
            Ok(Some(RawGeometry::Polygonal(MultiPolygon(vec![polygon]))))
        }
        "MultiPolygon" => {
            let polygons_json = value["coordinates"]
                .as_array()
                .ok_or_else(|| anyhow!("MultiPolygon has no coordinates"))?;
            let mut polygons = Vec::with_capacity(polygons_json.len());
            for rings in polygons_json {
                let rings = rings
                    .as_array()
                    .ok_or_else(|| anyhow!("MultiPolygon member is not an array"))?;
                polygons.push(parse_polygon_rings(rings)?);
            }
            Ok(Some(RawGeometry::Polygonal(MultiPolygon(polygons))))
        }
        "Point" | "MultiPoint" => Ok(Some(RawGeometry::NonPolygonal("Point"))),
        "LineString" | "MultiLineString" => Ok(Some(RawGeometry::NonPolygonal("LineString"))),
        _ => Ok(Some(RawGeometry::NonPolygonal("Other"))),
    }
}

/// First ring is the exterior, the rest are holes.
fn parse_polygon_rings(rings: &[Value]) -> Result<Polygon<f64>> {
    let exterior = rings
        .first()
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow!("Polygon is missing an exterior ring"))?;
    let exterior = parse_ring(exterior)?;

    let mut interiors = Vec::new();
    for ring in rings.iter().skip(1) {
        let ring = ring
            .as_array()
            .ok_or_else(|| anyhow!("Polygon interior ring is not an array"))?;
        interiors.push(parse_ring(ring)?);
    }

    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = Vec::with_capacity(coords.len());
    for pair in coords {
        let pair = pair
            .as_array()
            .ok_or_else(|| anyhow!("Coordinate is not an array"))?;
        let x = pair
            .first()
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("Coordinate x must be a number"))?;
        let y = pair
            .get(1)
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("Coordinate y must be a number"))?;
        points.push(Coord { x, y });
    }
    // Ensure the ring is closed.
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}
