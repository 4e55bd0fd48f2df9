//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over the database session,
//! allowing the spatial query client to run against PostGIS or a test fake.

pub mod postgres;
pub mod provider;
pub mod schema;
pub mod types;

// Re-export main types
pub use provider::Database;
pub use schema::{TableCatalog, TableEntry, TableName};
pub use types::{CellValue, ColumnDef, DataType, QueryResults, Row, SqlParam};
