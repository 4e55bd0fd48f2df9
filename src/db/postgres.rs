//! PostgreSQL/PostGIS database provider
//!
//! Concrete implementation using tokio-postgres.

use crate::config::ConnectionConfig;
use crate::config::connections::SslMode;
use crate::db::Database;
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row, SqlParam};
use crate::error::{DbError, DbResult};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_postgres::Client;
use tokio_postgres::types::{ToSql, Type};

/// PostgreSQL database provider
pub struct PostgresProvider {
    /// The tokio-postgres client
    client: Client,
    /// Background task driving the connection
    connection: JoinHandle<Result<(), String>>,
}

impl Database for PostgresProvider {
    async fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        let conn_string = config.connection_string_with_password();

        let (client, connection) = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) =
                    tokio_postgres::connect(&conn_string, tokio_postgres::NoTls)
                        .await
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                let handle = tokio::spawn(async move {
                    connection
                        .await
                        .map_err(|e| format!("Connection lost: {}", e))
                });
                (client, handle)
            }
            SslMode::Prefer | SslMode::Require => {
                let tls_config = make_tls_config();
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
                let (client, connection) = tokio_postgres::connect(&conn_string, tls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                let handle = tokio::spawn(async move {
                    connection
                        .await
                        .map_err(|e| format!("Connection lost: {}", e))
                });
                (client, handle)
            }
        };

        Ok(Self { client, connection })
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryResults> {
        let start = std::time::Instant::now();

        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| ColumnDef {
                name: col.name().to_string(),
                data_type: pg_type_to_datatype(col.type_()),
            })
            .collect();

        let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(as_sql).collect();
        let pg_rows = self
            .client
            .query(&stmt, &bound)
            .await
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        let row_count = pg_rows.len();
        let mut rows = Vec::with_capacity(row_count);

        for pg_row in &pg_rows {
            let mut values = Vec::with_capacity(columns.len());
            for (i, col_def) in columns.iter().enumerate() {
                values.push(extract_cell_value(pg_row, i, &col_def.data_type));
            }
            rows.push(Row { values });
        }

        Ok(QueryResults::new(columns, rows, start.elapsed(), row_count))
    }

    async fn is_healthy(&self) -> bool {
        !self.client.is_closed() && self.client.simple_query("SELECT 1").await.is_ok()
    }

    async fn close(self) -> DbResult<()> {
        let Self { client, connection } = self;
        // Dropping the last client handle makes the connection task finish.
        drop(client);
        match connection.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(msg)) => Err(DbError::ConnectionFailed(msg)),
            Err(e) => Err(DbError::ConnectionFailed(e.to_string())),
        }
    }
}

fn as_sql(param: &SqlParam) -> &(dyn ToSql + Sync) {
    match param {
        SqlParam::Text(s) => s,
        SqlParam::Int(i) => i,
        SqlParam::Bytes(b) => b,
    }
}

/// Map tokio_postgres Type to our DataType enum
fn pg_type_to_datatype(pg_type: &Type) -> DataType {
    match *pg_type {
        Type::INT2 => DataType::SmallInt,
        Type::INT4 => DataType::Integer,
        Type::INT8 => DataType::BigInt,
        Type::FLOAT4 => DataType::Real,
        Type::FLOAT8 => DataType::Double,
        Type::NUMERIC => DataType::Numeric,
        Type::TEXT | Type::NAME => DataType::Text,
        Type::VARCHAR => DataType::Varchar(None),
        Type::CHAR | Type::BPCHAR => DataType::Char(None),
        Type::BOOL => DataType::Boolean,
        Type::DATE => DataType::Date,
        Type::TIME => DataType::Time,
        Type::TIMESTAMP => DataType::Timestamp,
        Type::TIMESTAMPTZ => DataType::TimestampTz,
        Type::INTERVAL => DataType::Interval,
        Type::JSON => DataType::Json,
        Type::JSONB => DataType::Jsonb,
        Type::BYTEA => DataType::Bytea,
        Type::UUID => DataType::Uuid,
        Type::BOOL_ARRAY => DataType::Array(Box::new(DataType::Boolean)),
        Type::INT2_ARRAY => DataType::Array(Box::new(DataType::SmallInt)),
        Type::INT4_ARRAY => DataType::Array(Box::new(DataType::Integer)),
        Type::INT8_ARRAY => DataType::Array(Box::new(DataType::BigInt)),
        Type::FLOAT8_ARRAY => DataType::Array(Box::new(DataType::Double)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::NAME_ARRAY => {
            DataType::Array(Box::new(DataType::Text))
        }
        Type::NUMERIC_ARRAY => DataType::Array(Box::new(DataType::Numeric)),
        _ => DataType::Unknown(pg_type.name().to_string()),
    }
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Extract a cell value from a tokio_postgres Row based on the column's DataType.
///
/// Attribute columns of spatial tables are arbitrary, so this tries the
/// expected type first and falls back to a string representation.
fn extract_cell_value(row: &tokio_postgres::Row, idx: usize, data_type: &DataType) -> CellValue {
    match data_type {
        DataType::SmallInt => match row.try_get::<_, Option<i16>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v as i64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Integer => match row.try_get::<_, Option<i32>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v as i64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::BigInt => match row.try_get::<_, Option<i64>>(idx) {
            Ok(Some(v)) => CellValue::Integer(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Real => match row.try_get::<_, Option<f32>>(idx) {
            Ok(Some(v)) => CellValue::Float(v as f64),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Double => match row.try_get::<_, Option<f64>>(idx) {
            Ok(Some(v)) => CellValue::Float(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Numeric => match row.try_get::<_, Option<Decimal>>(idx) {
            Ok(Some(v)) => CellValue::Text(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Boolean => match row.try_get::<_, Option<bool>>(idx) {
            Ok(Some(v)) => CellValue::Boolean(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Json | DataType::Jsonb => {
            match row.try_get::<_, Option<serde_json::Value>>(idx) {
                Ok(Some(v)) => CellValue::Json(v),
                Ok(None) => CellValue::Null,
                Err(_) => try_as_string(row, idx),
            }
        }
        DataType::Bytea => match row.try_get::<_, Option<Vec<u8>>>(idx) {
            Ok(Some(v)) => CellValue::Binary(v),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Uuid => match row.try_get::<_, Option<uuid::Uuid>>(idx) {
            Ok(Some(v)) => CellValue::Uuid(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Array(inner) => extract_array_value(row, idx, inner),
        DataType::Timestamp => match row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            Ok(Some(v)) => CellValue::DateTime(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::TimestampTz => {
            match row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx) {
                Ok(Some(v)) => CellValue::DateTime(v.to_rfc3339()),
                Ok(None) => CellValue::Null,
                Err(_) => try_as_string(row, idx),
            }
        }
        DataType::Date => match row.try_get::<_, Option<chrono::NaiveDate>>(idx) {
            Ok(Some(v)) => CellValue::DateTime(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Time => match row.try_get::<_, Option<chrono::NaiveTime>>(idx) {
            Ok(Some(v)) => CellValue::DateTime(v.to_string()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        // Text types and fallback for unknown types
        _ => try_as_string(row, idx),
    }
}

/// Extract an array value, falling back to a string for element types
/// without a direct Rust mapping.
fn extract_array_value(row: &tokio_postgres::Row, idx: usize, inner: &DataType) -> CellValue {
    match inner {
        DataType::Text | DataType::Varchar(_) | DataType::Char(_) => {
            match row.try_get::<_, Option<Vec<String>>>(idx) {
                Ok(Some(v)) => CellValue::Array(v.into_iter().map(CellValue::Text).collect()),
                Ok(None) => CellValue::Null,
                Err(_) => try_as_string(row, idx),
            }
        }
        DataType::SmallInt => match row.try_get::<_, Option<Vec<i16>>>(idx) {
            Ok(Some(v)) => CellValue::Array(
                v.into_iter()
                    .map(|n| CellValue::Integer(n as i64))
                    .collect(),
            ),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Integer => match row.try_get::<_, Option<Vec<i32>>>(idx) {
            Ok(Some(v)) => CellValue::Array(
                v.into_iter()
                    .map(|n| CellValue::Integer(n as i64))
                    .collect(),
            ),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::BigInt => match row.try_get::<_, Option<Vec<i64>>>(idx) {
            Ok(Some(v)) => CellValue::Array(v.into_iter().map(CellValue::Integer).collect()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Double => match row.try_get::<_, Option<Vec<f64>>>(idx) {
            Ok(Some(v)) => CellValue::Array(v.into_iter().map(CellValue::Float).collect()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Boolean => match row.try_get::<_, Option<Vec<bool>>>(idx) {
            Ok(Some(v)) => CellValue::Array(v.into_iter().map(CellValue::Boolean).collect()),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        DataType::Numeric => match row.try_get::<_, Option<Vec<Decimal>>>(idx) {
            Ok(Some(v)) => CellValue::Array(
                v.into_iter()
                    .map(|d| CellValue::Text(d.to_string()))
                    .collect(),
            ),
            Ok(None) => CellValue::Null,
            Err(_) => try_as_string(row, idx),
        },
        _ => try_as_string(row, idx),
    }
}

/// Try to extract a value as a string (fallback for type mismatches).
fn try_as_string(row: &tokio_postgres::Row, idx: usize) -> CellValue {
    match row.try_get::<_, Option<String>>(idx) {
        Ok(Some(v)) => CellValue::Text(v),
        Ok(None) => CellValue::Null,
        Err(_) => {
            let type_name = row
                .columns()
                .get(idx)
                .map_or("unknown", |c| c.type_().name());
            CellValue::Text(format!("<unable to display: {}>", type_name))
        }
    }
}
