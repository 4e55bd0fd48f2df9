//! Spatial SQL construction
//!
//! Table names and catalog-resolved column identifiers are quoted and
//! interpolated into the SQL text, so they match the catalog lookups
//! case-exactly. The AOI geometry and its SRID are always bound as `$1`
//! (WKB `bytea`) and `$2` (`int4`). Caller filters are appended verbatim as
//! ` AND <filter>` and are NOT escaped: whoever supplies a filter controls
//! that part of the statement.

use crate::db::schema::TableName;
use serde::{Deserialize, Serialize};

/// Expression that builds the AOI geometry from the bound parameters
pub const AOI_GEOMETRY: &str = "ST_GeomFromWKB($1, $2)";

/// Alias of the WKB geometry column in related/intersecting results
pub const WKB_COLUMN: &str = "wkb_geom";

/// Counts tables, views and materialized views matching `$1` (owner) and `$2` (name)
pub const TABLE_EXISTS_SQL: &str = "SELECT \
     (SELECT count(*) FROM pg_catalog.pg_tables WHERE schemaname = $1 AND tablename = $2) \
   + (SELECT count(*) FROM pg_catalog.pg_views WHERE schemaname = $1 AND viewname = $2) \
   + (SELECT count(*) FROM pg_catalog.pg_matviews WHERE schemaname = $1 AND matviewname = $2) \
     AS obj_cnt";

/// Geometry-typed columns of `$1`.`$2`, in ordinal order
pub const GEOMETRY_COLUMN_SQL: &str = "SELECT a.attname::text \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_catalog.pg_type t ON t.oid = a.atttypid \
     WHERE n.nspname = $1 AND c.relname = $2 \
       AND a.attnum > 0 AND NOT a.attisdropped \
       AND t.typname = 'geometry' \
     ORDER BY a.attnum";

/// All columns of `$1`.`$2` except `$3`, in ordinal order
pub const COLUMNS_SQL: &str = "SELECT a.attname::text \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = $1 AND c.relname = $2 \
       AND a.attnum > 0 AND NOT a.attisdropped \
       AND a.attname <> $3 \
     ORDER BY a.attnum";

/// Kind of spatial interaction tested between a row geometry and the AOI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelateMask {
    /// Any interaction at all
    #[default]
    AnyInteract,
    /// Row geometry contains the AOI
    Contains,
    /// Row geometry lies inside the AOI
    Inside,
    /// Boundaries touch, interiors do not
    Touch,
    /// Interiors overlap and boundaries cross
    OverlapBdyIntersect,
    /// Geometries are equal
    Equal,
    /// Row geometry covers the AOI
    Covers,
    /// Row geometry is covered by the AOI
    CoveredBy,
}

impl RelateMask {
    /// PostGIS predicate function implementing this mask
    pub fn function(&self) -> &'static str {
        match self {
            RelateMask::AnyInteract => "ST_Intersects",
            RelateMask::Contains => "ST_Contains",
            RelateMask::Inside => "ST_Within",
            RelateMask::Touch => "ST_Touches",
            RelateMask::OverlapBdyIntersect => "ST_Overlaps",
            RelateMask::Equal => "ST_Equals",
            RelateMask::Covers => "ST_Covers",
            RelateMask::CoveredBy => "ST_CoveredBy",
        }
    }

    /// Predicate testing `geometry` against the bound AOI
    pub fn predicate(&self, geometry: &str) -> String {
        format!("{}({}, {})", self.function(), geometry, AOI_GEOMETRY)
    }
}

/// Quote an identifier for interpolation into SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote both parts of `OWNER.TABLE`
pub fn quote_table(table: &TableName) -> String {
    format!("{}.{}", quote_ident(&table.owner), quote_ident(&table.table))
}

fn push_filter(sql: &mut String, filter: Option<&str>) {
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        sql.push_str(" AND ");
        sql.push_str(filter);
    }
}

fn select_list(columns: &[String], geometry_expr: &str) -> String {
    let mut parts: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    parts.push(format!("ST_AsBinary({}) AS {}", geometry_expr, WKB_COLUMN));
    parts.join(", ")
}

/// Probe for at least one related row
pub fn relate_exists_sql(
    table: &TableName,
    geometry_column: &str,
    mask: RelateMask,
    filter: Option<&str>,
) -> String {
    let mut sql = format!(
        "SELECT 1 FROM {} WHERE {}",
        quote_table(table),
        mask.predicate(&quote_ident(geometry_column))
    );
    push_filter(&mut sql, filter);
    sql.push_str(" LIMIT 1");
    sql
}

/// Attribute columns plus the original geometry of every related row
pub fn related_sql(
    table: &TableName,
    columns: &[String],
    geometry_column: &str,
    mask: RelateMask,
    filter: Option<&str>,
) -> String {
    let geom = quote_ident(geometry_column);
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_list(columns, &geom),
        quote_table(table),
        mask.predicate(&geom)
    );
    push_filter(&mut sql, filter);
    sql
}

/// Attribute columns plus the row geometry clipped to the AOI
pub fn intersecting_sql(
    table: &TableName,
    columns: &[String],
    geometry_column: &str,
    mask: RelateMask,
    filter: Option<&str>,
) -> String {
    let geom = quote_ident(geometry_column);
    let clipped = format!("ST_Intersection({}, {})", geom, AOI_GEOMETRY);
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_list(columns, &clipped),
        quote_table(table),
        mask.predicate(&geom)
    );
    push_filter(&mut sql, filter);
    sql
}
