//! SQL formatting
//!
//! Pretty-prints generated SQL for trace logging.

use sqlformat::{FormatOptions, Indent, QueryParams, format};

/// Format a SQL query string
pub fn format_sql(sql: &str) -> String {
    format_sql_with_indent(sql, 2)
}

/// Format SQL with custom indentation
pub fn format_sql_with_indent(sql: &str, indent_size: u8) -> String {
    let options = FormatOptions {
        indent: Indent::Spaces(indent_size),
        uppercase: Some(true),
        lines_between_queries: 1,
        ..Default::default()
    };

    format(sql, &QueryParams::None, &options)
}
