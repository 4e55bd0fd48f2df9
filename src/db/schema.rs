//! Table catalog
//!
//! Memo of tables confirmed to exist, plus their introspected columns.
//! An entry's presence means the table is known to exist; column lists are
//! filled in lazily on first lookup.

use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::fmt;

/// A fully-qualified `OWNER.TABLE` name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    /// Owning schema
    pub owner: String,
    /// Table or view name
    pub table: String,
}

impl TableName {
    /// Parse `OWNER.TABLE`; exactly one dot is required.
    pub fn parse(qualified: &str) -> DbResult<Self> {
        let (owner, table) = qualified
            .trim()
            .split_once('.')
            .ok_or_else(|| DbError::InvalidTableName(qualified.to_string()))?;
        if owner.is_empty() || table.is_empty() || table.contains('.') {
            return Err(DbError::InvalidTableName(qualified.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            table: table.to_string(),
        })
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.table)
    }
}

/// What is known about one existing table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableEntry {
    /// Name of the geometry column, once looked up
    pub geometry_column: Option<String>,
    /// Attribute column names in catalog order, once looked up
    pub columns: Option<Vec<String>>,
}

/// Cache of table introspection results
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: HashMap<TableName, TableEntry>,
}

impl TableCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the table has been confirmed to exist
    pub fn contains(&self, table: &TableName) -> bool {
        self.tables.contains_key(table)
    }

    /// Record a table as existing (keeps any cached columns)
    pub fn register(&mut self, table: TableName) {
        self.tables.entry(table).or_default();
    }

    pub fn get(&self, table: &TableName) -> Option<&TableEntry> {
        self.tables.get(table)
    }

    pub fn get_mut(&mut self, table: &TableName) -> Option<&mut TableEntry> {
        self.tables.get_mut(table)
    }

    /// Forget one table; the next access re-queries the database
    pub fn invalidate(&mut self, table: &TableName) -> bool {
        self.tables.remove(table).is_some()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
