use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use proj4rs::transform::transform;
use proj4rs::Proj;

/// Reference system every stored geometry uses.
pub const STORAGE_EPSG: u32 = 4326;

/// Proj definition plus whether coordinates are geographic (degrees) rather
/// than projected (meters). proj4rs works in radians for geographic CRS, so
/// the flag drives the degree conversion at each end.
struct CrsDef {
    proj: Proj,
    geographic: bool,
}

/// Build a projection for the EPSG codes that show up in the boundary
/// sources we ingest. Anything else is an unsupported-CRS error, which is
/// fatal for the layer but not for the run.
fn crs_for_epsg(epsg: u32) -> Result<CrsDef> {
    let (def, geographic) = match epsg {
        4326 => ("+proj=longlat +datum=WGS84 +no_defs", true),
        4269 => ("+proj=longlat +datum=NAD83 +no_defs", true),
        3857 => (
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
            false,
        ),
        // WGS84 UTM zones, the usual projected CRS for national datasets.
        32601..=32660 => {
            let zone = epsg - 32600;
            let proj = Proj::from_proj_string(&format!(
                "+proj=utm +zone={zone} +datum=WGS84 +units=m +no_defs"
            ))
            .with_context(|| format!("Failed to build projection for EPSG:{epsg}"))?;
            return Ok(CrsDef { proj, geographic: false });
        }
        32701..=32760 => {
            let zone = epsg - 32700;
            let proj = Proj::from_proj_string(&format!(
                "+proj=utm +zone={zone} +south +datum=WGS84 +units=m +no_defs"
            ))
            .with_context(|| format!("Failed to build projection for EPSG:{epsg}"))?;
            return Ok(CrsDef { proj, geographic: false });
        }
        other => bail!("Unsupported source CRS: EPSG:{}", other),
    };
    let proj = Proj::from_proj_string(def)
        .with_context(|| format!("Failed to build projection for EPSG:{epsg}"))?;
    Ok(CrsDef { proj, geographic })
}

/// Reproject a MultiPolygon from `from_epsg` into the storage CRS.
/// A no-op (cheap clone) when the source already matches.
pub fn reproject_multipolygon(
    geometry: &MultiPolygon<f64>,
    from_epsg: u32,
) -> Result<MultiPolygon<f64>> {
    if from_epsg == STORAGE_EPSG {
        return Ok(geometry.clone());
    }
    let src = crs_for_epsg(from_epsg)?;
    let dst = crs_for_epsg(STORAGE_EPSG)?;

    let polygons = geometry
        .0
        .iter()
        .map(|polygon| {
            let exterior = reproject_ring(polygon.exterior(), &src, &dst)?;
            let interiors = polygon
                .interiors()
                .iter()
                .map(|ring| reproject_ring(ring, &src, &dst))
                .collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(exterior, interiors))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MultiPolygon(polygons))
}

fn reproject_ring(ring: &LineString<f64>, src: &CrsDef, dst: &CrsDef) -> Result<LineString<f64>> {
    let coords = ring
        .coords()
        .map(|coord| {
            let mut point = if src.geographic {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&src.proj, &dst.proj, &mut point)
                .map_err(|e| anyhow::anyhow!("Reprojection failed: {}", e))?;
            let (x, y) = if dst.geographic {
                (point.0.to_degrees(), point.1.to_degrees())
            } else {
                (point.0, point.1)
            };
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString(coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString(vec![
                Coord { x: min, y: min },
                Coord { x: max, y: min },
                Coord { x: max, y: max },
                Coord { x: min, y: max },
                Coord { x: min, y: min },
            ]),
            vec![],
        )])
    }

    #[test]
    fn matching_crs_is_a_no_op() {
        let mp = square(89.0, 90.0);
        let out = reproject_multipolygon(&mp, 4326).unwrap();
        assert_eq!(out, mp);
    }

    #[test]
    fn web_mercator_round_trips_to_degrees() {
        // 10018754.17 m is 90 degrees of longitude at the equator in EPSG:3857.
        let mp = square(0.0, 10_018_754.17);
        let out = reproject_multipolygon(&mp, 3857).unwrap();
        let coords: Vec<_> = out.0[0].exterior().coords().copied().collect();
        assert!((coords[0].x - 0.0).abs() < 1e-6);
        assert!((coords[1].x - 90.0).abs() < 1e-3);
        // All outputs must be plausible degrees.
        assert!(coords.iter().all(|c| c.x.abs() <= 180.0 && c.y.abs() <= 90.0));
    }

    #[test]
    fn unsupported_crs_is_an_error() {
        let mp = square(0.0, 1.0);
        let err = reproject_multipolygon(&mp, 27700).unwrap_err();
        assert!(err.to_string().contains("EPSG:27700"));
    }

    #[test]
    fn reprojection_is_deterministic() {
        let mp = square(100_000.0, 200_000.0);
        let a = reproject_multipolygon(&mp, 32646).unwrap();
        let b = reproject_multipolygon(&mp, 32646).unwrap();
        assert_eq!(a, b);
    }
}
