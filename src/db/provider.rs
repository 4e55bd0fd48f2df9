//! Database provider trait
//!
//! Defines the interface the spatial query client needs from a database
//! session. This abstraction allows for:
//! - Testing the query client against an in-memory fake
//! - Consistent error handling across backends

use crate::config::ConnectionConfig;
use crate::db::types::{QueryResults, SqlParam};
use crate::error::DbResult;

/// A single open database session
///
/// Implementations hold exactly one connection; callers run statements
/// sequentially and close the session explicitly when done.
pub trait Database: Send + Sync {
    /// Establish a session with the database
    ///
    /// # Errors
    /// Returns `DbError::ConnectionFailed` if the connection cannot be established
    async fn connect(config: &ConnectionConfig) -> DbResult<Self>
    where
        Self: Sized;

    /// Execute a statement with positional bind parameters and fetch all rows
    ///
    /// # Errors
    /// Returns `DbError::QueryFailed` if preparation or execution fails
    async fn query(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryResults>;

    /// Lightweight liveness check (e.g. `SELECT 1`)
    async fn is_healthy(&self) -> bool;

    /// Close the session and release the connection
    ///
    /// # Errors
    /// Returns error if the background connection ended abnormally
    async fn close(self) -> DbResult<()>
    where
        Self: Sized;
}
