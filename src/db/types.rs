//! Database type definitions
//!
//! Core data structures for representing query results, bind parameters,
//! data types, and values.

use std::time::Duration;

/// Query execution results
#[derive(Debug, Clone)]
pub struct QueryResults {
    /// Column definitions
    pub columns: Vec<ColumnDef>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Query execution time
    pub execution_time: Duration,
    /// Total row count
    pub row_count: usize,
}

/// Column definition in query results
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar(Option<usize>),
    Char(Option<usize>),

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data (WKB geometries arrive as bytea)
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// A single row of query results
#[derive(Debug, Clone)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value (stored as string)
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

/// A bound query parameter.
///
/// Only values travel as parameters; identifiers (table and column names)
/// are interpolated into the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text value (catalog lookups)
    Text(String),
    /// 32-bit integer (SRIDs)
    Int(i32),
    /// Binary value (WKB geometries)
    Bytes(Vec<u8>),
}

impl QueryResults {
    pub fn new(
        columns: Vec<ColumnDef>,
        rows: Vec<Row>,
        execution_time: Duration,
        row_count: usize,
    ) -> Self {
        Self {
            columns,
            rows,
            execution_time,
            row_count,
        }
    }

    /// An empty result with the given columns
    pub fn empty(columns: Vec<ColumnDef>) -> Self {
        Self::new(columns, Vec::new(), Duration::ZERO, 0)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// First value of the first row, if any
    pub fn scalar(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|r| r.values.first())
    }
}

impl DataType {
    /// Get a human-readable display name for this type
    pub fn display_name(&self) -> String {
        match self {
            DataType::SmallInt => "smallint".to_string(),
            DataType::Integer => "integer".to_string(),
            DataType::BigInt => "bigint".to_string(),
            DataType::Real => "real".to_string(),
            DataType::Double => "double precision".to_string(),
            DataType::Numeric => "numeric".to_string(),
            DataType::Text => "text".to_string(),
            DataType::Varchar(Some(n)) => format!("varchar({})", n),
            DataType::Varchar(None) => "varchar".to_string(),
            DataType::Char(Some(n)) => format!("char({})", n),
            DataType::Char(None) => "char".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Time => "time".to_string(),
            DataType::Timestamp => "timestamp".to_string(),
            DataType::TimestampTz => "timestamptz".to_string(),
            DataType::Interval => "interval".to_string(),
            DataType::Json => "json".to_string(),
            DataType::Jsonb => "jsonb".to_string(),
            DataType::Bytea => "bytea".to_string(),
            DataType::Uuid => "uuid".to_string(),
            DataType::Array(inner) => format!("{}[]", inner.display_name()),
            DataType::Unknown(s) => s.clone(),
        }
    }
}

impl CellValue {
    /// Get a display string for this cell value (truncated if needed)
    pub fn display_string(&self, max_len: usize) -> String {
        let full = match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Json(v) => v.to_string(),
            CellValue::Binary(b) => format!("<binary {} bytes>", b.len()),
            CellValue::DateTime(s) => s.clone(),
            CellValue::Uuid(s) => s.clone(),
            CellValue::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.display_string(max_len)).collect();
                format!("{{{}}}", items.join(","))
            }
        };

        if full.chars().count() > max_len {
            let kept: String = full.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            full
        }
    }

    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Integer view of the value (counts, ids)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value (catalog names)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Binary view of the value (WKB payloads)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Convert a JSON property value (AOI attributes) into a cell
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map_or(CellValue::Null, CellValue::Float),
            },
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Json(other.clone()),
        }
    }
}
