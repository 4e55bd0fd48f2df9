//! WKB and WKT encodings

use crate::error::{GeometryError, GeometryResult};
use geo_types::Geometry;
use geozero::wkb::Wkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};
use wkt::ToWkt;

/// Encode a geometry as 2D ISO/OGC well-known binary
pub fn to_wkb(geometry: &Geometry<f64>) -> GeometryResult<Vec<u8>> {
    geometry
        .to_wkb(CoordDimensions::xy())
        .map_err(|e| GeometryError::Wkb(e.to_string()))
}

/// Decode well-known binary (as returned by `ST_AsBinary`)
pub fn from_wkb(bytes: &[u8]) -> GeometryResult<Geometry<f64>> {
    Wkb(bytes.to_vec())
        .to_geo()
        .map_err(|e| GeometryError::Wkb(e.to_string()))
}

/// Well-known text form
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}
