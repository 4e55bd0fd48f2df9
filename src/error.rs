//! Error types for aoi-query
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.

use std::io;

/// Main error type for aoi-query
#[derive(Debug, thiserror::Error)]
pub enum AoiQueryError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// AOI loading errors
    #[error("AOI error: {0}")]
    Aoi(#[from] AoiError),

    /// Geometry processing errors
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A query method was called before an AOI was attached
    #[error("No AOI attached; call add_aoi first")]
    NoAoi,
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Catalog introspection failed
    #[error("Schema loading failed: {0}")]
    SchemaLoadFailed(String),

    /// Not connected to a database
    #[error("Not connected to database")]
    NotConnected,

    /// Table or view is not visible to the current user
    #[error("Table {0} does not exist for this user")]
    TableNotFound(String),

    /// Table has no column of the spatial geometry type
    #[error("Table {0} has no geometry column")]
    NoGeometryColumn(String),

    /// Table name is not of the form OWNER.TABLE
    #[error("Invalid table name '{0}': expected OWNER.TABLE")]
    InvalidTableName(String),

    /// Type conversion error
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

/// AOI file loading errors
#[derive(Debug, thiserror::Error)]
pub enum AoiError {
    /// Reading the file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// File extension is not a supported geometry format
    #[error("Unsupported AOI format: {0}")]
    UnsupportedFormat(String),

    /// File contents could not be parsed
    #[error("Failed to parse AOI: {0}")]
    Parse(String),

    /// Dataset contains no features
    #[error("AOI dataset {0} contains no features")]
    EmptyDataset(String),

    /// First feature has no geometry
    #[error("First AOI feature has no geometry")]
    MissingGeometry,

    /// Geometry processing failed
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Geometry encoding, reprojection and overlay errors
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// No projection definition for an EPSG code
    #[error("Unknown spatial reference EPSG:{0}")]
    UnknownSrid(u32),

    /// Coordinate transformation failed
    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    /// WKB encode/decode failed
    #[error("WKB error: {0}")]
    Wkb(String),

    /// Operation needs a polygonal geometry
    #[error("Expected a polygonal geometry, found {0}")]
    NotPolygonal(String),

    /// Result column missing from a query result
    #[error("Column '{0}' not found in result")]
    MissingColumn(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file not found
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// IO error while reading configuration
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Connection profile not found
    #[error("Connection profile '{0}' not found")]
    ProfileNotFound(String),

    /// Required environment variable is not set
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Specialized Result type for aoi-query operations
pub type Result<T> = std::result::Result<T, AoiQueryError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for AOI loading
pub type AoiResult<T> = std::result::Result<T, AoiError>;

/// Specialized Result type for geometry operations
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
