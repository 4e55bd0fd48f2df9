//! Spatial query client
//!
//! [`SpatialQueries`] owns one database session and one AOI. For a target
//! table it confirms the table exists, discovers its geometry and attribute
//! columns, and runs relate/intersect queries with the AOI geometry bound as
//! WKB.
//!
//! # Example
//!
//! ```no_run
//! use aoi_query::config::{ConnectionConfig, Settings};
//! use aoi_query::logging::Diagnostics;
//! use aoi_query::query::SpatialQueries;
//!
//! # async fn example() -> aoi_query::Result<()> {
//! let config = ConnectionConfig::from_env()?;
//! let mut db: SpatialQueries = SpatialQueries::open(config, &Settings::default(), Diagnostics::default()).await?;
//! db.add_aoi("block_7.kml")?;
//! let table = "whse_forest_vegetation.veg_comp_lyr_r1_poly";
//! if db.has_relate(table, Some("proj_age_1 > 30"), None).await? {
//!     let clipped = db.get_intersecting(table, Some("proj_age_1 > 30"), None).await?;
//!     println!("{} clipped polygons", clipped.len());
//! }
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::aoi::Aoi;
use crate::config::{ConnectionConfig, Settings};
use crate::db::postgres::PostgresProvider;
use crate::db::schema::{TableCatalog, TableName};
use crate::db::types::{CellValue, QueryResults, SqlParam};
use crate::db::Database;
use crate::error::{AoiQueryError, DbError, Result};
use crate::frame::GeoFrame;
use crate::logging::Diagnostics;
use crate::sql::builder::{
    self, COLUMNS_SQL, GEOMETRY_COLUMN_SQL, TABLE_EXISTS_SQL, WKB_COLUMN,
};
use crate::sql::{RelateMask, format_sql};
use std::path::Path;

/// Query behaviour taken from [`Settings`]
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// Spatial interaction tested against the AOI
    pub relate_mask: RelateMask,
    /// Column never selected from spatial tables
    pub excluded_column: String,
}

impl From<&Settings> for QuerySettings {
    fn from(settings: &Settings) -> Self {
        Self {
            relate_mask: settings.relate_mask,
            excluded_column: settings.excluded_column.clone(),
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Client for spatial queries against one database
pub struct SpatialQueries<D: Database = PostgresProvider> {
    config: ConnectionConfig,
    settings: QuerySettings,
    db: Option<D>,
    aoi: Option<Aoi>,
    catalog: TableCatalog,
    diagnostics: Diagnostics,
}

impl<D: Database> SpatialQueries<D> {
    /// Create a client without connecting; the session opens on first use
    pub fn new(
        config: ConnectionConfig,
        settings: impl Into<QuerySettings>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            config,
            settings: settings.into(),
            db: None,
            aoi: None,
            catalog: TableCatalog::new(),
            diagnostics,
        }
    }

    /// Create a client around an already-open session
    pub fn with_database(
        config: ConnectionConfig,
        settings: impl Into<QuerySettings>,
        diagnostics: Diagnostics,
        db: D,
    ) -> Self {
        let mut client = Self::new(config, settings, diagnostics);
        client.db = Some(db);
        client
    }

    /// Create a client and connect immediately
    pub async fn open(
        config: ConnectionConfig,
        settings: impl Into<QuerySettings>,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let mut client = Self::new(config, settings, diagnostics);
        client.connect().await?;
        Ok(client)
    }

    /// Open the session if none is open, then report its health.
    ///
    /// # Errors
    /// Connection failures are logged and returned, never swallowed.
    pub async fn connect(&mut self) -> Result<bool> {
        if self.db.is_none() {
            match D::connect(&self.config).await {
                Ok(db) => {
                    log::info!(
                        target: self.diagnostics.target(),
                        "Connected to {}",
                        self.config.connection_string()
                    );
                    self.db = Some(db);
                }
                Err(e) => {
                    log::error!(
                        target: self.diagnostics.target(),
                        "Failed to connect to {}: {}",
                        self.config.connection_string(),
                        e
                    );
                    return Err(e.into());
                }
            }
        }
        let db = self.db.as_ref().ok_or(DbError::NotConnected)?;
        let healthy = db.is_healthy().await;
        log::debug!(target: self.diagnostics.target(), "Connection healthy: {}", healthy);
        Ok(healthy)
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_some()
    }

    /// Close the session. The catalog and AOI go with the client.
    pub async fn close(mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            db.close().await?;
            log::debug!(target: self.diagnostics.target(), "Connection closed");
        }
        Ok(())
    }

    /// Load an AOI file, replacing any attached AOI
    pub fn add_aoi(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let aoi = Aoi::from_path(path)?;
        self.set_aoi(aoi);
        Ok(())
    }

    /// Attach an already-loaded AOI, replacing any attached AOI
    pub fn set_aoi(&mut self, aoi: Aoi) {
        self.aoi = Some(aoi);
    }

    pub fn aoi(&self) -> Option<&Aoi> {
        self.aoi.as_ref()
    }

    pub fn aoi_mut(&mut self) -> Option<&mut Aoi> {
        self.aoi.as_mut()
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    /// Mutable catalog access, for invalidation
    pub fn catalog_mut(&mut self) -> &mut TableCatalog {
        &mut self.catalog
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Whether `OWNER.TABLE` is a table or view visible to this user.
    ///
    /// Positive answers are remembered in the catalog; negative ones are
    /// not, so a table created later is found on the next call.
    pub async fn has_table(&mut self, table: &str) -> Result<bool> {
        let name = TableName::parse(table)?;
        self.has_table_name(&name).await
    }

    /// Name of the table's geometry column (the first one, by ordinal)
    pub async fn get_geometry_column(&mut self, table: &str) -> Result<String> {
        let name = self.require_table(table).await?;
        self.geometry_column_of(&name).await
    }

    /// Column names in catalog order, without the excluded annotation column
    pub async fn get_columns(&mut self, table: &str) -> Result<Vec<String>> {
        let name = self.require_table(table).await?;
        self.columns_of(&name).await
    }

    /// Whether any row of `table` interacts with the AOI (or its buffer ring)
    pub async fn has_relate(
        &mut self,
        table: &str,
        filter: Option<&str>,
        buffer: Option<f64>,
    ) -> Result<bool> {
        let name = self.require_table(table).await?;
        log::debug!(target: self.diagnostics.target(), "Check relate for {}", name);
        let geometry_column = self.geometry_column_of(&name).await?;
        let sql = builder::relate_exists_sql(
            &name,
            &geometry_column,
            self.settings.relate_mask,
            filter,
        );
        let params = self.aoi_params(buffer)?;
        let results = self.run(&sql, &params).await?;
        let related = !results.rows.is_empty();
        log::debug!(
            target: self.diagnostics.target(),
            "{} has {} features overlapping with AOI",
            name,
            if related { "at least 1" } else { "no" }
        );
        Ok(related)
    }

    /// Every related row with its original geometry
    pub async fn get_related(
        &mut self,
        table: &str,
        filter: Option<&str>,
        buffer: Option<f64>,
    ) -> Result<GeoFrame> {
        let name = self.require_table(table).await?;
        log::debug!(target: self.diagnostics.target(), "Get related from {}", name);
        let (geometry_column, columns) = self.select_columns(&name).await?;
        let sql = builder::related_sql(
            &name,
            &columns,
            &geometry_column,
            self.settings.relate_mask,
            filter,
        );
        self.fetch_frame(&name, &sql, buffer).await
    }

    /// Every related row with its geometry clipped to the AOI by the database
    pub async fn get_intersecting(
        &mut self,
        table: &str,
        filter: Option<&str>,
        buffer: Option<f64>,
    ) -> Result<GeoFrame> {
        let name = self.require_table(table).await?;
        log::debug!(target: self.diagnostics.target(), "Get intersection of {}", name);
        let (geometry_column, columns) = self.select_columns(&name).await?;
        let sql = builder::intersecting_sql(
            &name,
            &columns,
            &geometry_column,
            self.settings.relate_mask,
            filter,
        );
        self.fetch_frame(&name, &sql, buffer).await
    }

    /// Related rows intersected with the AOI (or buffer ring) on the client.
    ///
    /// Returns `None` when no row is related.
    pub async fn get_intersect_local(
        &mut self,
        table: &str,
        filter: Option<&str>,
        buffer: Option<f64>,
    ) -> Result<Option<GeoFrame>> {
        if !self.has_relate(table, filter, buffer).await? {
            return Ok(None);
        }
        let related = self.get_related(table, filter, buffer).await?;
        let aoi = self.aoi.as_mut().ok_or(AoiQueryError::NoAoi)?;
        let clip = match buffer {
            None => aoi.as_frame(),
            Some(distance) => aoi.buffer_frame(distance)?,
        };
        let overlay = related.overlay_intersection(&clip)?;
        log::debug!(
            target: self.diagnostics.target(),
            "{} has {} features after local intersection",
            table,
            overlay.len()
        );
        Ok(Some(overlay))
    }

    async fn has_table_name(&mut self, name: &TableName) -> Result<bool> {
        if self.catalog.contains(name) {
            return Ok(true);
        }
        let params = [
            SqlParam::Text(name.owner.clone()),
            SqlParam::Text(name.table.clone()),
        ];
        let results = self
            .run(TABLE_EXISTS_SQL, &params)
            .await
            .map_err(schema_error)?;
        let count = results.scalar().and_then(CellValue::as_i64).unwrap_or(0);
        log::debug!(target: self.diagnostics.target(), "has_table result is {}", count);
        if count > 0 {
            self.catalog.register(name.clone());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn require_table(&mut self, table: &str) -> Result<TableName> {
        let name = TableName::parse(table)?;
        if self.has_table_name(&name).await? {
            Ok(name)
        } else {
            Err(DbError::TableNotFound(table.to_string()).into())
        }
    }

    async fn geometry_column_of(&mut self, name: &TableName) -> Result<String> {
        if let Some(column) = self
            .catalog
            .get(name)
            .and_then(|entry| entry.geometry_column.clone())
        {
            return Ok(column);
        }
        let params = [
            SqlParam::Text(name.owner.clone()),
            SqlParam::Text(name.table.clone()),
        ];
        let results = self
            .run(GEOMETRY_COLUMN_SQL, &params)
            .await
            .map_err(schema_error)?;
        let column = results
            .scalar()
            .and_then(CellValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| DbError::NoGeometryColumn(name.to_string()))?;
        if let Some(entry) = self.catalog.get_mut(name) {
            entry.geometry_column = Some(column.clone());
        }
        Ok(column)
    }

    async fn columns_of(&mut self, name: &TableName) -> Result<Vec<String>> {
        if let Some(columns) = self.catalog.get(name).and_then(|entry| entry.columns.clone()) {
            return Ok(columns);
        }
        let params = [
            SqlParam::Text(name.owner.clone()),
            SqlParam::Text(name.table.clone()),
            SqlParam::Text(self.settings.excluded_column.clone()),
        ];
        let results = self
            .run(COLUMNS_SQL, &params)
            .await
            .map_err(schema_error)?;
        let columns: Vec<String> = results
            .rows
            .iter()
            .filter_map(|row| row.values.first().and_then(CellValue::as_text))
            .map(str::to_string)
            .collect();
        log::debug!(
            target: self.diagnostics.target(),
            "get_columns --> {}",
            columns.join(",")
        );
        if let Some(entry) = self.catalog.get_mut(name) {
            entry.columns = Some(columns.clone());
        }
        Ok(columns)
    }

    /// Geometry column plus the attribute columns to select alongside it
    async fn select_columns(&mut self, name: &TableName) -> Result<(String, Vec<String>)> {
        let geometry_column = self.geometry_column_of(name).await?;
        let mut columns = self.columns_of(name).await?;
        columns.retain(|c| *c != geometry_column);
        Ok((geometry_column, columns))
    }

    async fn fetch_frame(
        &mut self,
        name: &TableName,
        sql: &str,
        buffer: Option<f64>,
    ) -> Result<GeoFrame> {
        let params = self.aoi_params(buffer)?;
        let results = self.run(sql, &params).await?;
        let frame = GeoFrame::from_wkb_results(results, WKB_COLUMN, Aoi::EPSG)?;
        log::debug!(
            target: self.diagnostics.target(),
            "{} has {} features overlapping with AOI",
            name,
            frame.len()
        );
        Ok(frame)
    }

    /// `$1` = AOI (or buffer ring) WKB, `$2` = SRID
    fn aoi_params(&mut self, buffer: Option<f64>) -> Result<Vec<SqlParam>> {
        let aoi = self.aoi.as_mut().ok_or(AoiQueryError::NoAoi)?;
        let wkb = aoi.query_wkb(buffer)?;
        Ok(vec![SqlParam::Bytes(wkb), SqlParam::Int(Aoi::EPSG as i32)])
    }

    async fn run(&mut self, sql: &str, params: &[SqlParam]) -> Result<QueryResults> {
        if self.db.is_none() {
            self.connect().await?;
        }
        let target = self.diagnostics.target();
        if log::log_enabled!(target: target, log::Level::Trace) {
            log::trace!(target: target, "SQL:\n{}", format_sql(sql));
        }
        let db = self.db.as_ref().ok_or(DbError::NotConnected)?;
        Ok(db.query(sql, params).await?)
    }
}

/// Catalog lookups report failures as schema errors
fn schema_error(err: AoiQueryError) -> AoiQueryError {
    match err {
        AoiQueryError::Database(DbError::QueryFailed(msg)) => {
            AoiQueryError::Database(DbError::SchemaLoadFailed(msg))
        }
        other => other,
    }
}

impl<D: Database> Drop for SpatialQueries<D> {
    fn drop(&mut self) {
        if self.db.is_some() {
            log::warn!(
                target: self.diagnostics.target(),
                "Spatial query client dropped with an open connection; call close()"
            );
        }
    }
}
