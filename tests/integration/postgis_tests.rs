//! Integration tests against a live PostGIS database
//!
//! Each test builds its own schema and drops it afterwards. Tests return
//! early when the database or the PostGIS extension is unavailable.

use aoi_query::config::ConnectionConfig;
use aoi_query::config::connections::SslMode;
use aoi_query::db::Database;
use aoi_query::db::postgres::PostgresProvider;
use aoi_query::db::types::CellValue;
use aoi_query::error::{AoiQueryError, DbError};
use aoi_query::logging::Diagnostics;
use aoi_query::{Aoi, QuerySettings, SpatialQueries};
use geo_types::{Geometry, polygon};

/// Get test database connection config
fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        name: "integration-test".to_string(),
        host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5433),
        database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "gis".to_string()),
        username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "test_user".to_string()),
        password: Some(
            std::env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "test_password".to_string()),
        ),
        ssl_mode: SslMode::Disable,
    }
}

fn square(x0: f64, y0: f64, size: f64) -> Geometry<f64> {
    polygon![
        (x: x0, y: y0),
        (x: x0 + size, y: y0),
        (x: x0 + size, y: y0 + size),
        (x: x0, y: y0 + size),
        (x: x0, y: y0),
    ]
    .into()
}

fn square_wkt(x0: f64, y0: f64, size: f64) -> String {
    format!(
        "POLYGON(({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))",
        x0 = x0,
        y0 = y0,
        x1 = x0 + size,
        y1 = y0 + size
    )
}

/// Connect and create a fresh schema holding one `stands` table.
///
/// Stand 1 straddles the west edge of the AOI used by the tests, stands 2
/// and 3 lie inside it, stand 4 is far away.
async fn setup(tag: &str) -> Option<(PostgresProvider, String)> {
    let db = match PostgresProvider::connect(&test_config()).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Skipping test: Database not available - {}", e);
            return None;
        }
    };
    if db.query("SELECT postgis_version()", &[]).await.is_err() {
        eprintln!("Skipping test: PostGIS extension not installed");
        let _ = db.close().await;
        return None;
    }

    let schema = format!("aoi_it_{}_{}", std::process::id(), tag);
    let stands = [
        (1, 10, square_wkt(999_950.0, 500_450.0, 100.0)),
        (2, 20, square_wkt(1_000_350.0, 500_450.0, 100.0)),
        (3, 30, square_wkt(1_000_750.0, 500_450.0, 100.0)),
        (4, 40, square_wkt(1_200_000.0, 500_000.0, 100.0)),
    ];
    let mut statements = vec![
        format!("DROP SCHEMA IF EXISTS {} CASCADE", schema),
        format!("CREATE SCHEMA {}", schema),
        format!(
            "CREATE TABLE {}.stands (id int, shape geometry(Polygon, 3005), age int, se_anno_cad_data text)",
            schema
        ),
    ];
    for (id, age, wkt) in stands {
        statements.push(format!(
            "INSERT INTO {}.stands VALUES ({}, ST_GeomFromText('{}', 3005), {}, 'anno')",
            schema, id, wkt, age
        ));
    }
    for sql in statements {
        db.query(&sql, &[]).await.expect("setup statement");
    }
    Some((db, schema))
}

async fn teardown(db: PostgresProvider, schema: &str) {
    let _ = db
        .query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema), &[])
        .await;
    let _ = db.close().await;
}

async fn client() -> SpatialQueries {
    let mut client: SpatialQueries =
        SpatialQueries::open(test_config(), QuerySettings::default(), Diagnostics::default())
            .await
            .expect("connect");
    client.set_aoi(Aoi::from_geometry(square(1_000_000.0, 500_000.0, 1_000.0), Aoi::EPSG).unwrap());
    client
}

fn ids(frame: &aoi_query::GeoFrame) -> Vec<i64> {
    (0..frame.len())
        .filter_map(|i| frame.value(i, "id").and_then(CellValue::as_i64))
        .collect()
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let mut config = test_config();
    config.port = 1;
    let result: Result<SpatialQueries, _> =
        SpatialQueries::open(config, QuerySettings::default(), Diagnostics::default()).await;
    assert!(matches!(
        result,
        Err(AoiQueryError::Database(DbError::ConnectionFailed(_)))
    ));
}

#[tokio::test]
async fn test_health_check_and_close() {
    let Ok(db) = PostgresProvider::connect(&test_config()).await else {
        eprintln!("Skipping test: Database not available");
        return;
    };
    assert!(db.is_healthy().await);
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_catalog_lookups() {
    let Some((db, schema)) = setup("catalog").await else {
        return;
    };
    let table = format!("{}.stands", schema);
    let mut client = client().await;

    assert!(client.has_table(&table).await.unwrap());
    assert!(!client.has_table(&format!("{}.nothing", schema)).await.unwrap());
    assert_eq!(client.get_geometry_column(&table).await.unwrap(), "shape");
    assert_eq!(
        client.get_columns(&table).await.unwrap(),
        vec!["id", "shape", "age"]
    );

    client.close().await.unwrap();
    teardown(db, &schema).await;
}

#[tokio::test]
async fn test_spatial_queries() {
    let Some((db, schema)) = setup("spatial").await else {
        return;
    };
    let table = format!("{}.stands", schema);
    let mut client = client().await;

    assert!(client.has_relate(&table, None, None).await.unwrap());
    assert!(!client.has_relate(&table, Some("age > 35"), None).await.unwrap());

    let related = client.get_related(&table, None, None).await.unwrap();
    let mut found = ids(&related);
    found.sort();
    assert_eq!(found, vec![1, 2, 3]);
    assert!((related.total_area() - 30_000.0).abs() < 1e-6);

    let clipped = client.get_intersecting(&table, Some("age < 25"), None).await.unwrap();
    assert_eq!(clipped.len(), 2);
    assert!((clipped.total_area() - 15_000.0).abs() < 1e-6);

    let ring = client.get_related(&table, None, Some(100.0)).await.unwrap();
    assert_eq!(ids(&ring), vec![1]);

    let local = client
        .get_intersect_local(&table, None, None)
        .await
        .unwrap()
        .expect("stands overlap the AOI");
    assert!((local.total_area() - 25_000.0).abs() < 1e-6);

    client.close().await.unwrap();
    teardown(db, &schema).await;
}

#[tokio::test]
async fn test_mixed_case_table() {
    let Some((db, schema)) = setup("case").await else {
        return;
    };
    db.query(
        &format!(
            "CREATE TABLE {}.\"Stands_Upper\" AS SELECT * FROM {}.stands",
            schema, schema
        ),
        &[],
    )
    .await
    .expect("create mixed-case table");
    let table = format!("{}.Stands_Upper", schema);
    let mut client = client().await;

    assert!(client.has_table(&table).await.unwrap());
    assert!(client.has_relate(&table, None, None).await.unwrap());
    let related = client.get_related(&table, None, None).await.unwrap();
    assert_eq!(related.len(), 3);

    client.close().await.unwrap();
    teardown(db, &schema).await;
}
