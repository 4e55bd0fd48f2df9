//! Area of interest
//!
//! An [`Aoi`] is one geometry, always held in BC Albers (EPSG:3005), with
//! its WKT/WKB forms and a per-distance cache of outside buffer rings.

pub mod loader;

use crate::db::types::{CellValue, ColumnDef, DataType};
use crate::error::{AoiResult, GeometryError, GeometryResult};
use crate::frame::GeoFrame;
use crate::spatial::overlay::{geometry_kind, to_multi_polygon};
use crate::spatial::{reproject, to_wkb, to_wkt};
use geo::{Area, BooleanOps, Buffer};
use geo_types::{Geometry, MultiPolygon, Polygon};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use loader::{AoiFormat, SourceFeature, read_first_feature};

/// Area of interest in the fixed spatial reference
#[derive(Debug, Clone)]
pub struct Aoi {
    geometry: Geometry<f64>,
    attributes: Vec<(String, CellValue)>,
    source_srid: u32,
    /// Buffer rings keyed by the exact bits of the requested distance
    buffers: HashMap<u64, Arc<MultiPolygon<f64>>>,
}

impl Aoi {
    /// EPSG code every AOI is expressed in (NAD83 / BC Albers)
    pub const EPSG: u32 = 3005;

    /// Load the first feature of a GeoJSON or KML file
    pub fn from_path(path: impl AsRef<Path>) -> AoiResult<Self> {
        let path = path.as_ref();
        let feature = read_first_feature(path)?;
        log::debug!(
            "Loaded AOI from {} (EPSG:{})",
            path.display(),
            feature.srid
        );
        Self::from_feature(feature)
    }

    /// Wrap an already-read feature, reprojecting if needed
    pub fn from_feature(feature: SourceFeature) -> AoiResult<Self> {
        let mut aoi = Self::from_geometry(feature.geometry, feature.srid)?;
        aoi.attributes = feature.attributes;
        Ok(aoi)
    }

    /// Wrap a geometry expressed in `srid`, reprojecting if needed
    pub fn from_geometry(geometry: Geometry<f64>, srid: u32) -> AoiResult<Self> {
        let geometry = if srid == Self::EPSG {
            geometry
        } else {
            reproject(&geometry, srid, Self::EPSG)?
        };
        Ok(Self {
            geometry,
            attributes: Vec::new(),
            source_srid: srid,
            buffers: HashMap::new(),
        })
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// Spatial reference of the geometry (always [`Aoi::EPSG`])
    pub fn srid(&self) -> u32 {
        Self::EPSG
    }

    /// Spatial reference the source file declared
    pub fn source_srid(&self) -> u32 {
        self.source_srid
    }

    pub fn attributes(&self) -> &[(String, CellValue)] {
        &self.attributes
    }

    pub fn wkt(&self) -> String {
        to_wkt(&self.geometry)
    }

    pub fn wkb(&self) -> GeometryResult<Vec<u8>> {
        to_wkb(&self.geometry)
    }

    /// Ring of width `|distance|` along the AOI's outer boundary.
    ///
    /// Holes are ignored: each polygon is reduced to its exterior first.
    ///
    /// Both single-sided candidates are computed: outside the boundary
    /// (AOI grown by `|distance|` minus the AOI) and inside it (AOI minus the
    /// AOI shrunk by `|distance|`). The one with the larger area is kept and
    /// cached under `distance`; later calls with the same value return the
    /// same `Arc`. The distance is not validated.
    pub fn outside_buffer(&mut self, distance: f64) -> GeometryResult<Arc<MultiPolygon<f64>>> {
        if let Some(ring) = self.buffers.get(&distance.to_bits()) {
            return Ok(Arc::clone(ring));
        }

        let polygons = to_multi_polygon(&self.geometry)
            .ok_or_else(|| GeometryError::NotPolygonal(geometry_kind(&self.geometry).to_string()))?;
        let polygons: MultiPolygon<f64> = polygons
            .iter()
            .map(|p| Polygon::new(p.exterior().clone(), vec![]))
            .collect();
        let width = distance.abs();

        let outer = polygons.buffer(width).difference(&polygons);
        let outer_area = outer.unsigned_area();
        log::debug!("Outside buffer area: {} m2", outer_area);

        let inner = polygons.difference(&polygons.buffer(-width));
        let inner_area = inner.unsigned_area();
        log::debug!("Inside buffer area: {} m2", inner_area);

        let ring = Arc::new(if outer_area > inner_area { outer } else { inner });
        self.buffers.insert(distance.to_bits(), Arc::clone(&ring));
        Ok(ring)
    }

    /// Number of cached buffer rings
    pub fn cached_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// WKB of the AOI, or of its buffer ring when `buffer` is given
    pub fn query_wkb(&mut self, buffer: Option<f64>) -> GeometryResult<Vec<u8>> {
        match buffer {
            None => self.wkb(),
            Some(distance) => {
                let ring = self.outside_buffer(distance)?;
                to_wkb(&Geometry::MultiPolygon((*ring).clone()))
            }
        }
    }

    /// The AOI as a one-row frame carrying its attributes
    pub fn as_frame(&self) -> GeoFrame {
        let columns = self
            .attributes
            .iter()
            .map(|(name, value)| ColumnDef {
                name: name.clone(),
                data_type: data_type_of(value),
            })
            .collect();
        let values = self.attributes.iter().map(|(_, v)| v.clone()).collect();
        let mut frame = GeoFrame::new(columns, Self::EPSG);
        frame.push(values, Some(self.geometry.clone()));
        frame
    }

    /// The buffer ring for `distance` as a one-row frame without attributes
    pub fn buffer_frame(&mut self, distance: f64) -> GeometryResult<GeoFrame> {
        let ring = self.outside_buffer(distance)?;
        let mut frame = GeoFrame::new(Vec::new(), Self::EPSG);
        frame.push(Vec::new(), Some(Geometry::MultiPolygon((*ring).clone())));
        Ok(frame)
    }
}

fn data_type_of(value: &CellValue) -> DataType {
    match value {
        CellValue::Integer(_) => DataType::BigInt,
        CellValue::Float(_) => DataType::Double,
        CellValue::Boolean(_) => DataType::Boolean,
        CellValue::Json(_) => DataType::Json,
        _ => DataType::Text,
    }
}
