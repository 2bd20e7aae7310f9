//! PostgreSQL warehouse implementation.
//!
//! Provides the `PostgresWarehouse` struct that implements the `Warehouse` trait
//! for PostgreSQL databases using sqlx.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgConnection, PgRow, PgValueFormat};
use sqlx::types::Uuid;
use sqlx::{Column, Connection, Executor, Row as SqlxRow, Statement as _, TypeInfo, ValueRef};
use tracing::{debug, warn};

use super::{
    closed_error, execution_error, fetch_capped, is_transient_error, map_connection_error,
    Warehouse,
};
use crate::config::ConnectionConfig;
use crate::error::{Result, SqlrunError};
use crate::model::{ColumnMeta, ResultSet, Row, RowLimit, Value};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL warehouse over a single connection.
#[derive(Debug)]
pub struct PostgresWarehouse {
    conn: Option<PgConnection>,
}

impl PostgresWarehouse {
    /// Connects, retrying transient failures with exponential backoff.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            match PgConnection::connect(&conn_str).await {
                Ok(conn) => {
                    debug!(connection = %config.display_string(), "Connected to PostgreSQL");
                    return Ok(Self { conn: Some(conn) });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(map_connection_error(e, config)),
            }
        }
    }

    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(closed_error)
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn describe(&mut self, sql: &str) -> Result<Vec<ColumnMeta>> {
        let conn = self.conn()?;
        let described = (&mut *conn).describe(sql).await.map_err(execution_error)?;

        Ok(described
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                ColumnMeta::new(col.name(), col.type_info().name())
                    .with_nullable(described.nullable(i))
            })
            .collect())
    }

    async fn execute(&mut self, sql: &str, limit: RowLimit) -> Result<ResultSet> {
        let conn = self.conn()?;
        let prepared = (&mut *conn).prepare(sql).await.map_err(execution_error)?;
        let columns: Vec<ColumnMeta> = prepared
            .columns()
            .iter()
            .map(|col| ColumnMeta::new(col.name(), col.type_info().name()))
            .collect();

        if columns.is_empty() {
            let done = sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .map_err(execution_error)?;
            return Ok(ResultSet::status(done.rows_affected()));
        }

        let stream = sqlx::query(sql).fetch(&mut *conn);
        let (rows, truncated) = fetch_capped(stream, limit, convert_row).await?;

        let mut result = ResultSet::new(columns, rows)?;
        result.truncated = truncated;
        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(|e| {
                SqlrunError::connection(format!("Failed to close connection: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" => get::<bool>(row, index).map(Value::Bool),
        "INT2" => get::<i16>(row, index).map(|v| Value::Int(v.into())),
        "INT4" => get::<i32>(row, index).map(|v| Value::Int(v.into())),
        "INT8" => get::<i64>(row, index).map(Value::Int),
        "FLOAT4" => get::<f32>(row, index).map(|v| Value::Float(v.into())),
        "FLOAT8" => get::<f64>(row, index).map(Value::Float),
        "NUMERIC" => get::<Decimal>(row, index).map(Value::Decimal),
        "DATE" => get::<NaiveDate>(row, index).map(Value::Date),
        "TIME" => get::<NaiveTime>(row, index).map(Value::Time),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index).map(Value::Timestamp),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index).map(Value::TimestampTz),
        "BYTEA" => get::<Vec<u8>>(row, index).map(Value::Bytes),
        "JSON" | "JSONB" => get::<serde_json::Value>(row, index).map(Value::Json),
        "UUID" => get::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "INTERVAL" => get::<PgInterval>(row, index).map(|v| Value::String(interval_text(&v))),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, index).map(array_value),
        "INT4[]" => get::<Vec<i32>>(row, index).map(array_value),
        "INT8[]" => get::<Vec<i64>>(row, index).map(array_value),
        "FLOAT8[]" => get::<Vec<f64>>(row, index).map(array_value),
        "BOOL[]" => get::<Vec<bool>>(row, index).map(array_value),
        _ => get::<String>(row, index).map(Value::String),
    };
    value.unwrap_or_else(|| undecoded_value(row, index, type_name))
}

/// Falls back to the wire text of a value no decoder matched.
fn undecoded_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    if matches!(raw.format(), PgValueFormat::Text) {
        if let Ok(text) = raw.as_str() {
            return Value::String(text.to_string());
        }
    }
    warn!(
        column = row.column(index).name(),
        type_name, "Cannot decode value; exported as NULL"
    );
    Value::Null
}

fn array_value<T: Into<serde_json::Value>>(items: Vec<T>) -> Value {
    Value::Json(serde_json::Value::Array(items.into_iter().map(Into::into).collect()))
}

/// Renders an interval the way PostgreSQL prints it, e.g. `1 year 2 mons 3 days 04:05:06`.
fn interval_text(interval: &PgInterval) -> String {
    fn unit(n: i32, name: &str) -> String {
        if n.abs() == 1 {
            format!("{n} {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    for (n, name) in [(years, "year"), (months, "mon"), (interval.days, "day")] {
        if n != 0 {
            parts.push(unit(n, name));
        }
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let seconds = micros / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            clock.push_str(format!(".{fraction:06}").trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}
