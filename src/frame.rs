//! Geometry-aware result tables
//!
//! A [`GeoFrame`] is what the query client hands back: the attribute
//! columns of each matched row plus one decoded geometry per row, all in a
//! single spatial reference.

use crate::db::types::{CellValue, ColumnDef, QueryResults};
use crate::error::{GeometryError, GeometryResult};
use crate::spatial::overlay::{geometry_kind, intersect, to_multi_polygon};
use crate::spatial::{from_wkb, to_wkt};
use geo::Area;
use geo_types::Geometry;
use std::collections::HashSet;

/// One row: attribute values plus its geometry (`None` for SQL NULL)
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub values: Vec<CellValue>,
    pub geometry: Option<Geometry<f64>>,
}

/// Tabular result with a geometry column
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFrame {
    /// Attribute columns (the geometry column is not listed here)
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<GeoRow>,
    /// EPSG code of every geometry in the frame
    pub srid: u32,
}

impl GeoFrame {
    /// Empty frame with the given attribute columns
    pub fn new(columns: Vec<ColumnDef>, srid: u32) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            srid,
        }
    }

    /// Build a frame from query results whose `wkb_column` holds WKB bytes.
    ///
    /// The WKB column is removed from the attribute columns and decoded into
    /// each row's geometry.
    pub fn from_wkb_results(
        results: QueryResults,
        wkb_column: &str,
        srid: u32,
    ) -> GeometryResult<Self> {
        let wkb_idx = results
            .column_index(wkb_column)
            .ok_or_else(|| GeometryError::MissingColumn(wkb_column.to_string()))?;

        let mut columns = results.columns;
        columns.remove(wkb_idx);

        let mut rows = Vec::with_capacity(results.rows.len());
        for row in results.rows {
            let mut values = row.values;
            if wkb_idx >= values.len() {
                return Err(GeometryError::MissingColumn(wkb_column.to_string()));
            }
            let geometry = match values.remove(wkb_idx) {
                CellValue::Null => None,
                CellValue::Binary(bytes) => Some(from_wkb(&bytes)?),
                other => {
                    return Err(GeometryError::Wkb(format!(
                        "expected binary in '{}', found {}",
                        wkb_column,
                        other.display_string(20)
                    )));
                }
            };
            rows.push(GeoRow { values, geometry });
        }

        Ok(Self {
            columns,
            rows,
            srid,
        })
    }

    pub fn push(&mut self, values: Vec<CellValue>, geometry: Option<Geometry<f64>>) {
        self.rows.push(GeoRow { values, geometry });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value of a named column in a row
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values.get(idx))
    }

    /// Iterate the row geometries
    pub fn geometries(&self) -> impl Iterator<Item = Option<&Geometry<f64>>> {
        self.rows.iter().map(|r| r.geometry.as_ref())
    }

    /// WKT of each row geometry (empty string for NULL)
    pub fn wkt(&self) -> Vec<String> {
        self.geometries()
            .map(|g| g.map(to_wkt).unwrap_or_default())
            .collect()
    }

    /// Sum of the planar areas of all geometries
    pub fn total_area(&self) -> f64 {
        self.geometries().flatten().map(|g| g.unsigned_area()).sum()
    }

    /// Pairwise intersection of every row with every row of `right`.
    ///
    /// Each output row carries the left attributes followed by the right
    /// attributes; column names present on both sides get `_1`/`_2`
    /// suffixes. Pairs with no overlap and rows without geometry are dropped.
    /// Every geometry in `right` must be polygonal.
    pub fn overlay_intersection(&self, right: &GeoFrame) -> GeometryResult<GeoFrame> {
        let clips = right
            .rows
            .iter()
            .map(|row| match &row.geometry {
                Some(g) => to_multi_polygon(g)
                    .ok_or_else(|| GeometryError::NotPolygonal(geometry_kind(g).to_string())),
                None => Err(GeometryError::NotPolygonal("NULL".to_string())),
            })
            .collect::<GeometryResult<Vec<_>>>()?;

        let mut out = GeoFrame::new(merge_columns(&self.columns, &right.columns), self.srid);
        for left in &self.rows {
            let Some(geometry) = &left.geometry else {
                continue;
            };
            for (right_row, clip) in right.rows.iter().zip(&clips) {
                if let Some(piece) = intersect(geometry, clip) {
                    let mut values = left.values.clone();
                    values.extend(right_row.values.iter().cloned());
                    out.push(values, Some(piece));
                }
            }
        }
        Ok(out)
    }
}

fn merge_columns(left: &[ColumnDef], right: &[ColumnDef]) -> Vec<ColumnDef> {
    let left_names: HashSet<&str> = left.iter().map(|c| c.name.as_str()).collect();
    let right_names: HashSet<&str> = right.iter().map(|c| c.name.as_str()).collect();

    let rename = |col: &ColumnDef, clash: bool, suffix: &str| ColumnDef {
        name: if clash {
            format!("{}{}", col.name, suffix)
        } else {
            col.name.clone()
        },
        data_type: col.data_type.clone(),
    };

    left.iter()
        .map(|c| rename(c, right_names.contains(c.name.as_str()), "_1"))
        .chain(
            right
                .iter()
                .map(|c| rename(c, left_names.contains(c.name.as_str()), "_2")),
        )
        .collect()
}
