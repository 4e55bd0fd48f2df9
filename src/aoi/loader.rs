//! Geometry file readers
//!
//! Reads the first feature of a GeoJSON or KML file together with the
//! spatial reference the file declares.

use crate::db::types::CellValue;
use crate::error::{AoiError, AoiResult};
use geo_types::Geometry;
use geojson::{GeoJson, JsonObject};
use std::path::Path;

/// EPSG code of WGS 84 longitude/latitude
pub const WGS84: u32 = 4326;

/// First feature of a geometry dataset
#[derive(Debug, Clone)]
pub struct SourceFeature {
    pub geometry: Geometry<f64>,
    /// Feature attributes in file order
    pub attributes: Vec<(String, CellValue)>,
    /// EPSG code the coordinates are expressed in
    pub srid: u32,
}

/// Supported AOI file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoiFormat {
    GeoJson,
    Kml,
}

impl AoiFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> AoiResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "geojson" | "json" => Ok(AoiFormat::GeoJson),
            "kml" => Ok(AoiFormat::Kml),
            _ => Err(AoiError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read the first feature of the dataset at `path`
pub fn read_first_feature(path: &Path) -> AoiResult<SourceFeature> {
    let format = AoiFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| AoiError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let name = path.display().to_string();
    match format {
        AoiFormat::GeoJson => parse_geojson(&content, &name),
        AoiFormat::Kml => parse_kml(&content, &name),
    }
}

/// Parse GeoJSON text; `name` labels errors
pub fn parse_geojson(content: &str, name: &str) -> AoiResult<SourceFeature> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| AoiError::Parse(e.to_string()))?;

    let (feature, srid) = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let srid = declared_srid(fc.foreign_members.as_ref()).unwrap_or(WGS84);
            let feature = fc
                .features
                .into_iter()
                .next()
                .ok_or_else(|| AoiError::EmptyDataset(name.to_string()))?;
            (feature, srid)
        }
        GeoJson::Feature(feature) => {
            let srid = declared_srid(feature.foreign_members.as_ref()).unwrap_or(WGS84);
            (feature, srid)
        }
        GeoJson::Geometry(geometry) => {
            let srid = declared_srid(geometry.foreign_members.as_ref()).unwrap_or(WGS84);
            let geometry = Geometry::<f64>::try_from(geometry)
                .map_err(|e| AoiError::Parse(e.to_string()))?;
            return Ok(SourceFeature {
                geometry,
                attributes: Vec::new(),
                srid,
            });
        }
    };

    let attributes = feature
        .properties
        .as_ref()
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                .collect()
        })
        .unwrap_or_default();
    let geometry = feature.geometry.ok_or(AoiError::MissingGeometry)?;
    let geometry =
        Geometry::<f64>::try_from(geometry).map_err(|e| AoiError::Parse(e.to_string()))?;

    Ok(SourceFeature {
        geometry,
        attributes,
        srid,
    })
}

/// Parse KML text; KML coordinates are always WGS 84
pub fn parse_kml(content: &str, name: &str) -> AoiResult<SourceFeature> {
    let kml: kml::Kml<f64> = content
        .parse()
        .map_err(|e: kml::Error| AoiError::Parse(e.to_string()))?;
    let collection = geo_types::GeometryCollection::<f64>::try_from(kml)
        .map_err(|e| AoiError::Parse(e.to_string()))?;
    let geometry = collection
        .0
        .into_iter()
        .next()
        .ok_or_else(|| AoiError::EmptyDataset(name.to_string()))?;
    Ok(SourceFeature {
        geometry,
        attributes: Vec::new(),
        srid: WGS84,
    })
}

/// EPSG code from a legacy GeoJSON `crs` member, e.g.
/// `{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3005"}}`
fn declared_srid(members: Option<&JsonObject>) -> Option<u32> {
    let name = members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    parse_crs_name(name)
}

fn parse_crs_name(name: &str) -> Option<u32> {
    if name.ends_with("CRS84") {
        return Some(WGS84);
    }
    name.rsplit(':').next()?.trim().parse().ok()
}
