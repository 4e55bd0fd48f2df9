//! aoi-query - find PostGIS features overlapping an area of interest
//!
//! aoi-query loads an area of interest (AOI) from a GeoJSON or KML file,
//! reprojects it to BC Albers (EPSG:3005), and asks a PostGIS database which
//! rows of a spatial table interact with it.
//!
//! # Architecture
//!
//! - [`aoi`]: AOI loading, reprojection and buffer rings
//! - [`query`]: the spatial query client
//! - [`db`]: database sessions and the table catalog
//! - [`sql`]: spatial SQL construction and formatting
//! - [`spatial`]: WKB/WKT codecs, reprojection and overlay
//! - [`frame`]: geometry-aware result tables
//! - [`export`] / [`table`]: GeoJSON/CSV output and terminal previews
//! - [`config`], [`logging`], [`error`]: ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use aoi_query::config::{ConnectionConfig, Settings};
//! use aoi_query::logging::Diagnostics;
//! use aoi_query::query::SpatialQueries;
//!
//! # async fn example() -> aoi_query::Result<()> {
//! let config = ConnectionConfig::from_url("postgres://gis@localhost/gis")?;
//! let mut client: SpatialQueries =
//!     SpatialQueries::new(config, &Settings::default(), Diagnostics::default());
//! client.add_aoi("aoi.geojson")?;
//! let frame = client.get_related("whse.parcels", None, Some(50.0)).await?;
//! println!("{} parcels within 50 m of the boundary", frame.len());
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod aoi;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod frame;
pub mod logging;
pub mod query;
pub mod spatial;
pub mod sql;
pub mod table;

pub use aoi::Aoi;
pub use error::{AoiQueryError, Result};
pub use frame::{GeoFrame, GeoRow};
pub use query::{QuerySettings, SpatialQueries};
