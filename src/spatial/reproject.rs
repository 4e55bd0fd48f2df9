//! Coordinate reprojection between EPSG spatial references

use crate::error::{GeometryError, GeometryResult};
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use proj4rs::proj::Proj;

/// Build a projection from an EPSG code
pub fn projection(srid: u32) -> GeometryResult<Proj> {
    let code = u16::try_from(srid).map_err(|_| GeometryError::UnknownSrid(srid))?;
    let def = crs_definitions::from_code(code).ok_or(GeometryError::UnknownSrid(srid))?;
    Proj::from_proj_string(def.proj4).map_err(|e| GeometryError::Reprojection(e.to_string()))
}

/// Reproject a geometry from `from` to `to`.
///
/// Equal SRIDs return the geometry untouched.
pub fn reproject(geometry: &Geometry<f64>, from: u32, to: u32) -> GeometryResult<Geometry<f64>> {
    if from == to {
        return Ok(geometry.clone());
    }
    let src = projection(from)?;
    let dst = projection(to)?;
    geometry.try_map_coords(|c| transform_coord(&src, &dst, c))
}

// proj4rs works in radians for geographic systems
fn transform_coord(src: &Proj, dst: &Proj, c: Coord<f64>) -> GeometryResult<Coord<f64>> {
    let mut point = if src.is_latlong() {
        (c.x.to_radians(), c.y.to_radians(), 0.0)
    } else {
        (c.x, c.y, 0.0)
    };
    proj4rs::transform::transform(src, dst, &mut point)
        .map_err(|e| GeometryError::Reprojection(e.to_string()))?;
    if !point.0.is_finite() || !point.1.is_finite() {
        return Err(GeometryError::Reprojection(format!(
            "({}, {}) has no finite image",
            c.x, c.y
        )));
    }
    Ok(if dst.is_latlong() {
        Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        }
    } else {
        Coord {
            x: point.0,
            y: point.1,
        }
    })
}
