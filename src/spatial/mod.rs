//! Geometry utilities
//!
//! Encodings, reprojection and client-side overlay on `geo` types.

pub mod codec;
pub mod overlay;
pub mod reproject;

pub use codec::{from_wkb, to_wkb, to_wkt};
pub use overlay::{intersect, to_multi_polygon};
pub use reproject::reproject;
