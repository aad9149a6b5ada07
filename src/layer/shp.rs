use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use regex::Regex;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Reader, Shape};

use super::{AttrValue, RawFeature, RawGeometry, RawLayer};

/// Read a shapefile (with its .dbf attributes) into a raw layer.
pub(super) fn read_shapefile_layer(path: &Path) -> Result<RawLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("shapefile")
        .to_string();
    let epsg = epsg_from_prj(path);

    let mut columns: Vec<String> = Vec::new();
    let mut features = Vec::with_capacity(reader.shape_count()?);

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;

        let mut attrs = HashMap::new();
        for (field, value) in record {
            if !columns.iter().any(|c| c == &field) {
                columns.push(field.clone());
            }
            attrs.insert(field, field_to_attr(value));
        }

        features.push(RawFeature { attrs, geometry: shape_to_geometry(shape) });
    }

    Ok(RawLayer { name, epsg, columns, features })
}

fn field_to_attr(value: FieldValue) -> AttrValue {
    match value {
        FieldValue::Character(Some(text)) => AttrValue::Text(text),
        FieldValue::Numeric(Some(n)) => AttrValue::Number(n),
        FieldValue::Float(Some(n)) => AttrValue::Number(n as f64),
        FieldValue::Integer(n) => AttrValue::Number(n as f64),
        FieldValue::Double(n) => AttrValue::Number(n),
        FieldValue::Logical(Some(flag)) => AttrValue::Text(flag.to_string()),
        FieldValue::Date(Some(date)) => AttrValue::Text(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => AttrValue::Null,
    }
}

fn shape_to_geometry(shape: Shape) -> Option<RawGeometry> {
    match shape {
        Shape::Polygon(p) => Some(RawGeometry::Polygonal(rings_to_multipolygon(
            p.rings().iter().map(ring_points),
        ))),
        Shape::PolygonM(p) => Some(RawGeometry::Polygonal(rings_to_multipolygon(
            p.rings().iter().map(ring_points_m),
        ))),
        Shape::PolygonZ(p) => Some(RawGeometry::Polygonal(rings_to_multipolygon(
            p.rings().iter().map(ring_points_z),
        ))),
        Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_)
        | Shape::Multipoint(_) | Shape::MultipointM(_) | Shape::MultipointZ(_) => {
            Some(RawGeometry::NonPolygonal("Point"))
        }
        Shape::Polyline(_) | Shape::PolylineM(_) | Shape::PolylineZ(_) => {
            Some(RawGeometry::NonPolygonal("LineString"))
        }
        Shape::NullShape => None,
        _ => Some(RawGeometry::NonPolygonal("Other")),
    }
}

fn ring_points(ring: &PolygonRing<shapefile::Point>) -> (bool, Vec<Coord<f64>>) {
    let outer = matches!(ring, PolygonRing::Outer(_));
    (outer, ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

fn ring_points_m(ring: &PolygonRing<shapefile::PointM>) -> (bool, Vec<Coord<f64>>) {
    let outer = matches!(ring, PolygonRing::Outer(_));
    (outer, ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

fn ring_points_z(ring: &PolygonRing<shapefile::PointZ>) -> (bool, Vec<Coord<f64>>) {
    let outer = matches!(ring, PolygonRing::Outer(_));
    (outer, ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

/// Assemble shapefile rings into a MultiPolygon. Shapefiles store each outer
/// ring followed by its holes, so an outer ring starts a new polygon.
fn rings_to_multipolygon<I>(rings: I) -> MultiPolygon<f64>
where
    I: Iterator<Item = (bool, Vec<Coord<f64>>)>,
{
    fn close_ring(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for (is_outer, coords) in rings {
        let ring = close_ring(coords);
        if is_outer {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ring);
        } else if exterior.is_some() {
            holes.push(ring);
        } else {
            // Hole before any outer ring; treat it as an exterior so the
            // geometry is not silently lost.
            exterior = Some(ring);
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

/// Best-effort EPSG detection from the .prj sidecar WKT. Returns `None` when
/// the sidecar is missing or names a CRS we do not recognize; callers decide
/// what an unknown CRS means.
pub(crate) fn epsg_from_prj(shp_path: &Path) -> Option<u32> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = std::fs::read_to_string(prj_path).ok()?;
    epsg_from_wkt(&wkt)
}

fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    let lower = wkt.to_ascii_lowercase();

    if lower.contains("pseudo-mercator") || lower.contains("web_mercator") {
        return Some(3857);
    }
    // UTM zones on WGS84: EPSG 326xx (north) / 327xx (south).
    let utm = Regex::new(r"utm[_ ]zone[_ ](\d{1,2})\s*([ns])").expect("valid utm pattern");
    if let Some(caps) = utm.captures(&lower) {
        let zone: u32 = caps[1].parse().ok()?;
        if (1..=60).contains(&zone) {
            return Some(if &caps[2] == "n" { 32600 + zone } else { 32700 + zone });
        }
    }
    if lower.contains("north_american_1983") || lower.contains("nad83") {
        return Some(4269);
    }
    if lower.contains("wgs_1984") || lower.contains("wgs 84") || lower.contains("wgs84") {
        return Some(4326);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_detection_recognizes_common_crs() {
        assert_eq!(epsg_from_wkt("GEOGCS[\"GCS_WGS_1984\",...]"), Some(4326));
        assert_eq!(
            epsg_from_wkt("PROJCS[\"WGS_1984_Web_Mercator_Auxiliary_Sphere\",...]"),
            Some(3857)
        );
        assert_eq!(
            epsg_from_wkt("PROJCS[\"WGS_1984_UTM_Zone_36S\",GEOGCS[\"GCS_WGS_1984\"...]"),
            Some(32736)
        );
        assert_eq!(epsg_from_wkt("PROJCS[\"Kertau_RSO_Malaya\",...]"), None);
    }

    #[test]
    fn outer_rings_start_new_polygons() {
        let square = |offset: f64| {
            vec![
                Coord { x: offset, y: 0.0 },
                Coord { x: offset + 1.0, y: 0.0 },
                Coord { x: offset + 1.0, y: 1.0 },
                Coord { x: offset, y: 1.0 },
            ]
        };
        let rings = vec![(true, square(0.0)), (true, square(5.0))];
        let mp = rings_to_multipolygon(rings.into_iter());
        assert_eq!(mp.0.len(), 2);
        // Rings come back closed.
        let ext = mp.0[0].exterior();
        assert_eq!(ext.0.first(), ext.0.last());
    }

    #[test]
    fn holes_attach_to_preceding_outer_ring() {
        let rings = vec![
            (
                true,
                vec![
                    Coord { x: 0.0, y: 0.0 },
                    Coord { x: 10.0, y: 0.0 },
                    Coord { x: 10.0, y: 10.0 },
                    Coord { x: 0.0, y: 10.0 },
                ],
            ),
            (
                false,
                vec![
                    Coord { x: 4.0, y: 4.0 },
                    Coord { x: 6.0, y: 4.0 },
                    Coord { x: 6.0, y: 6.0 },
                    Coord { x: 4.0, y: 6.0 },
                ],
            ),
        ];
        let mp = rings_to_multipolygon(rings.into_iter());
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
    }
}
