//! Query result export (GeoJSON / CSV)
//!
//! Pure serialization functions, no filesystem I/O. The caller writes the
//! returned string to disk.

use crate::db::types::CellValue;
use crate::error::{AoiQueryError, Result};
use crate::frame::GeoFrame;
use std::path::Path;

/// Name of the geometry column in CSV output
pub const WKT_COLUMN: &str = "geometry";

/// Export format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    GeoJson,
    Csv,
}

impl ExportFormat {
    /// File extension for this format (without leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Csv => "csv",
        }
    }

    /// Pick a format from an output path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("geojson") | Some("json") => Some(ExportFormat::GeoJson),
            Some("csv") => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// Serialize a frame in the chosen format
pub fn export(frame: &GeoFrame, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::GeoJson => to_geojson(frame),
        ExportFormat::Csv => Ok(to_csv(frame)),
    }
}

/// Serialize a frame as a GeoJSON FeatureCollection.
///
/// Coordinates stay in the frame's spatial reference, which is named in a
/// legacy `crs` member so the file loads back with the same SRID.
pub fn to_geojson(frame: &GeoFrame) -> Result<String> {
    let features = frame
        .rows
        .iter()
        .map(|row| {
            let mut properties = geojson::JsonObject::new();
            for (col, cell) in frame.columns.iter().zip(&row.values) {
                properties.insert(col.name.clone(), cell_to_json(cell));
            }
            geojson::Feature {
                bbox: None,
                geometry: row
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut crs = geojson::JsonObject::new();
    crs.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": {"name": format!("urn:ogc:def:crs:EPSG::{}", frame.srid)}
        }),
    );

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(crs),
    };
    serde_json::to_string_pretty(&collection)
        .map_err(|e| AoiQueryError::Io(std::io::Error::other(e)))
}

/// Serialize a frame as RFC 4180 CSV with a trailing WKT geometry column.
pub fn to_csv(frame: &GeoFrame) -> String {
    let mut out = String::new();

    for col in &frame.columns {
        csv_escape_into(&mut out, &col.name);
        out.push(',');
    }
    out.push_str(WKT_COLUMN);
    out.push('\n');

    for (row, wkt) in frame.rows.iter().zip(frame.wkt()) {
        for cell in &row.values {
            csv_escape_into(&mut out, &cell_to_export_string(cell));
            out.push(',');
        }
        csv_escape_into(&mut out, &wkt);
        out.push('\n');
    }

    out
}

/// Full untruncated value string for CSV export (NULL → empty string).
fn cell_to_export_string(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(f) => f.to_string(),
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Json(v) => v.to_string(),
        CellValue::Binary(b) => hex_encode(b),
        CellValue::DateTime(s) => s.clone(),
        CellValue::Uuid(s) => s.clone(),
        CellValue::Array(arr) => {
            let items: Vec<String> = arr.iter().map(cell_to_export_string).collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// Convert a CellValue to a serde_json::Value with type preservation.
fn cell_to_json(cell: &CellValue) -> serde_json::Value {
    match cell {
        CellValue::Null => serde_json::Value::Null,
        CellValue::Integer(i) => serde_json::json!(*i),
        CellValue::Float(f) => {
            if f.is_finite() {
                serde_json::json!(*f)
            } else {
                // NaN / Infinity aren't valid JSON numbers
                serde_json::Value::String(f.to_string())
            }
        }
        CellValue::Text(s) => serde_json::Value::String(s.clone()),
        CellValue::Boolean(b) => serde_json::Value::Bool(*b),
        CellValue::Json(v) => v.clone(),
        CellValue::Binary(b) => serde_json::Value::String(hex_encode(b)),
        CellValue::DateTime(s) => serde_json::Value::String(s.clone()),
        CellValue::Uuid(s) => serde_json::Value::String(s.clone()),
        CellValue::Array(arr) => serde_json::Value::Array(arr.iter().map(cell_to_json).collect()),
    }
}

/// Quote a field if it contains `,` `"` or a newline (RFC 4180).
fn csv_escape_into(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Hex-encode binary data (e.g. `\xdeadbeef`).
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("\\x");
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}
