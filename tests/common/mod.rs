//! Common test utilities and helpers
//!
//! [`FakeGis`] is an in-memory stand-in for a PostGIS session. It answers
//! the catalog statements the query client issues and evaluates the spatial
//! statements with `geo`, so client behaviour can be tested without a
//! database. Every statement it receives is recorded.

#![allow(dead_code)]

use aoi_query::config::{ConnectionConfig, SslMode};
use aoi_query::db::Database;
use aoi_query::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row, SqlParam};
use aoi_query::error::{DbError, DbResult};
use aoi_query::sql::builder::{AOI_GEOMETRY, COLUMNS_SQL, GEOMETRY_COLUMN_SQL, TABLE_EXISTS_SQL};
use aoi_query::spatial::{from_wkb, intersect, to_multi_polygon, to_wkb};
use geo::{Contains, Intersects, Within};
use geo_types::{Geometry, polygon};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed test connection configuration
pub fn test_connection_config() -> ConnectionConfig {
    ConnectionConfig {
        name: "test".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        database: "gis".to_string(),
        username: "test_user".to_string(),
        password: Some("test_password".to_string()),
        ssl_mode: SslMode::Disable,
    }
}

/// Axis-aligned square in BC Albers coordinates
pub fn square(x0: f64, y0: f64, size: f64) -> Geometry<f64> {
    polygon![
        (x: x0, y: y0),
        (x: x0 + size, y: y0),
        (x: x0 + size, y: y0 + size),
        (x: x0, y: y0 + size),
        (x: x0, y: y0),
    ]
    .into()
}

/// One spatial table held by the fake
#[derive(Debug, Clone)]
pub struct FakeTable {
    /// All columns in ordinal order, geometry column included
    pub columns: Vec<String>,
    pub geometry_column: Option<String>,
    pub rows: Vec<FakeRow>,
}

#[derive(Debug, Clone)]
pub struct FakeRow {
    pub attributes: HashMap<String, CellValue>,
    pub geometry: Geometry<f64>,
}

impl FakeTable {
    pub fn new(columns: &[&str], geometry_column: Option<&str>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            geometry_column: geometry_column.map(str::to_string),
            rows: Vec::new(),
        }
    }

    /// Add a row; `values` follow the non-geometry columns in order
    pub fn row(mut self, values: Vec<CellValue>, geometry: Geometry<f64>) -> Self {
        let names = self
            .columns
            .iter()
            .filter(|c| Some(*c) != self.geometry_column.as_ref());
        let attributes = names.cloned().zip(values).collect();
        self.rows.push(FakeRow {
            attributes,
            geometry,
        });
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub tables: HashMap<(String, String), FakeTable>,
    pub statements: Vec<String>,
    pub healthy: bool,
    pub closed: bool,
}

/// In-memory spatial database; clones share state
#[derive(Debug, Clone)]
pub struct FakeGis {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeGis {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGis {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                healthy: true,
                ..FakeState::default()
            })),
        }
    }

    pub fn with_table(self, qualified: &str, table: FakeTable) -> Self {
        let (owner, name) = qualified.split_once('.').expect("OWNER.TABLE");
        self.state
            .lock()
            .unwrap()
            .tables
            .insert((owner.to_string(), name.to_string()), table);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    /// Number of received statements equal to `sql`
    pub fn count(&self, sql: &str) -> usize {
        self.statements().iter().filter(|s| s.as_str() == sql).count()
    }

    /// Number of received statements that are not catalog lookups
    pub fn spatial_count(&self) -> usize {
        self.statements()
            .iter()
            .filter(|s| ![TABLE_EXISTS_SQL, GEOMETRY_COLUMN_SQL, COLUMNS_SQL].contains(&s.as_str()))
            .count()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.lock().unwrap().healthy = healthy;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn table(&self, owner: &str, name: &str) -> Option<FakeTable> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
    }

    fn answer(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryResults> {
        if sql == TABLE_EXISTS_SQL {
            let (owner, name) = (text(params, 0)?, text(params, 1)?);
            let count = i64::from(self.table(owner, name).is_some());
            return Ok(single_column("obj_cnt", DataType::BigInt, vec![CellValue::Integer(count)]));
        }
        if sql == GEOMETRY_COLUMN_SQL {
            let (owner, name) = (text(params, 0)?, text(params, 1)?);
            let values = self
                .table(owner, name)
                .and_then(|t| t.geometry_column)
                .map(CellValue::Text)
                .into_iter()
                .collect();
            return Ok(single_column("attname", DataType::Text, values));
        }
        if sql == COLUMNS_SQL {
            let (owner, name, excluded) = (text(params, 0)?, text(params, 1)?, text(params, 2)?);
            let values = self
                .table(owner, name)
                .map(|t| t.columns)
                .unwrap_or_default()
                .into_iter()
                .filter(|c| c != excluded)
                .map(CellValue::Text)
                .collect();
            return Ok(single_column("attname", DataType::Text, values));
        }
        self.spatial(sql, params)
    }

    fn spatial(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryResults> {
        let statement = SpatialStatement::parse(sql)?;
        let (owner, name) = fold_qualified(&statement.table)?;
        let table = self
            .table(&owner, &name)
            .ok_or_else(|| fail(&format!("relation \"{}\" does not exist", statement.table)))?;

        let aoi = match params.first() {
            Some(SqlParam::Bytes(wkb)) => from_wkb(wkb).map_err(|e| fail(&e.to_string()))?,
            _ => return Err(fail("$1 must be WKB")),
        };
        if !matches!(params.get(1), Some(SqlParam::Int(3005))) {
            return Err(fail("$2 must be SRID 3005"));
        }

        let mut matched = Vec::new();
        for row in &table.rows {
            if statement.relates(&row.geometry, &aoi)? && statement.passes_filter(row)? {
                matched.push(row);
            }
        }

        let Some(select) = &statement.select else {
            let rows = matched
                .iter()
                .take(1)
                .map(|_| Row {
                    values: vec![CellValue::Integer(1)],
                })
                .collect();
            return Ok(QueryResults::new(
                vec![column("?column?", DataType::Integer)],
                rows,
                Duration::ZERO,
                matched.len().min(1),
            ));
        };

        let clip = to_multi_polygon(&aoi);
        let mut columns: Vec<ColumnDef> = select
            .columns
            .iter()
            .map(|c| column(c, DataType::Integer))
            .collect();
        columns.push(column("wkb_geom", DataType::Bytea));

        let mut rows = Vec::new();
        for row in matched {
            let mut values: Vec<CellValue> = select
                .columns
                .iter()
                .map(|c| row.attributes.get(c).cloned().unwrap_or(CellValue::Null))
                .collect();
            let geometry = if select.clipped {
                clip.as_ref().and_then(|mp| intersect(&row.geometry, mp))
            } else {
                Some(row.geometry.clone())
            };
            values.push(match geometry {
                Some(g) => CellValue::Binary(to_wkb(&g).map_err(|e| fail(&e.to_string()))?),
                None => CellValue::Null,
            });
            rows.push(Row { values });
        }
        let count = rows.len();
        Ok(QueryResults::new(columns, rows, Duration::ZERO, count))
    }
}

impl Database for FakeGis {
    async fn connect(_config: &ConnectionConfig) -> DbResult<Self> {
        Ok(FakeGis::new())
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryResults> {
        if self.is_closed() {
            return Err(DbError::NotConnected);
        }
        self.state.lock().unwrap().statements.push(sql.to_string());
        self.answer(sql, params)
    }

    async fn is_healthy(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.healthy && !state.closed
    }

    async fn close(self) -> DbResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// The parts of a generated spatial statement the fake needs
struct SpatialStatement {
    table: String,
    function: String,
    filter: Option<String>,
    /// `None` for the existence probe
    select: Option<Selection>,
}

struct Selection {
    columns: Vec<String>,
    clipped: bool,
}

impl SpatialStatement {
    fn parse(sql: &str) -> DbResult<Self> {
        let body = sql
            .strip_prefix("SELECT ")
            .ok_or_else(|| fail("expected SELECT"))?;
        let (select_list, rest) = body
            .split_once(" FROM ")
            .ok_or_else(|| fail("expected FROM"))?;
        let (table, where_clause) = rest
            .split_once(" WHERE ")
            .ok_or_else(|| fail("expected WHERE"))?;
        let where_clause = where_clause.strip_suffix(" LIMIT 1").unwrap_or(where_clause);

        let aoi_arg = format!("{})", AOI_GEOMETRY);
        let pred_end = where_clause
            .find(&aoi_arg)
            .map(|i| i + aoi_arg.len())
            .ok_or_else(|| fail("AOI predicate not found"))?;
        let function = where_clause[..where_clause.find('(').unwrap_or(0)].to_string();
        let filter = where_clause[pred_end..]
            .strip_prefix(" AND ")
            .map(str::to_string);

        let select = if select_list == "1" {
            None
        } else {
            let wkb_at = select_list
                .find("ST_AsBinary(")
                .ok_or_else(|| fail("geometry not selected"))?;
            let columns = select_list[..wkb_at]
                .trim_end_matches(", ")
                .split(", ")
                .filter(|c| !c.is_empty())
                .map(|c| c.trim_matches('"').to_string())
                .collect();
            Some(Selection {
                columns,
                clipped: select_list[wkb_at..].contains("ST_Intersection("),
            })
        };

        Ok(Self {
            table: table.to_string(),
            function,
            filter,
            select,
        })
    }

    fn relates(&self, row: &Geometry<f64>, aoi: &Geometry<f64>) -> DbResult<bool> {
        match self.function.as_str() {
            "ST_Intersects" => Ok(row.intersects(aoi)),
            "ST_Contains" => Ok(row.contains(aoi)),
            "ST_Within" => Ok(row.is_within(aoi)),
            other => Err(fail(&format!("function {} not supported", other))),
        }
    }

    /// Supports `<column> > <number>` only
    fn passes_filter(&self, row: &FakeRow) -> DbResult<bool> {
        let Some(filter) = &self.filter else {
            return Ok(true);
        };
        let (name, bound) = filter
            .split_once(" > ")
            .ok_or_else(|| fail(&format!("syntax error at or near \"{}\"", filter)))?;
        let bound: f64 = bound
            .trim()
            .parse()
            .map_err(|_| fail(&format!("invalid number \"{}\"", bound)))?;
        let value = match row.attributes.get(name.trim()) {
            Some(CellValue::Integer(i)) => *i as f64,
            Some(CellValue::Float(f)) => *f,
            Some(CellValue::Null) => return Ok(false),
            _ => return Err(fail(&format!("column \"{}\" does not exist", name))),
        };
        Ok(value > bound)
    }
}

/// Resolve `owner.table` the way PostgreSQL does: quoted parts keep their
/// case, unquoted parts fold to lower case
fn fold_qualified(text: &str) -> DbResult<(String, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => {
                quoted = !quoted;
                was_quoted = true;
            }
            '.' if !quoted => {
                parts.push(if was_quoted { current } else { current.to_lowercase() });
                current = String::new();
                was_quoted = false;
            }
            c => current.push(c),
        }
    }
    parts.push(if was_quoted { current } else { current.to_lowercase() });
    match <[String; 2]>::try_from(parts) {
        Ok([owner, name]) => Ok((owner, name)),
        Err(_) => Err(fail("unqualified table")),
    }
}

fn fail(msg: &str) -> DbError {
    DbError::QueryFailed(msg.to_string())
}

fn text(params: &[SqlParam], idx: usize) -> DbResult<&str> {
    match params.get(idx) {
        Some(SqlParam::Text(s)) => Ok(s),
        other => Err(fail(&format!("expected text at ${}, got {:?}", idx + 1, other))),
    }
}

fn column(name: &str, data_type: DataType) -> ColumnDef {
    ColumnDef {
        name: name.to_string(),
        data_type,
    }
}

fn single_column(name: &str, data_type: DataType, values: Vec<CellValue>) -> QueryResults {
    let rows: Vec<Row> = values
        .into_iter()
        .map(|v| Row { values: vec![v] })
        .collect();
    let count = rows.len();
    QueryResults::new(vec![column(name, data_type)], rows, Duration::ZERO, count)
}
