//! SQL generation
//!
//! Spatial query construction and formatting.

pub mod builder;
pub mod formatter;

pub use builder::{RelateMask, WKB_COLUMN, quote_ident};
pub use formatter::format_sql;
