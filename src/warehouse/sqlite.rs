//! SQLite warehouse implementation.
//!
//! SQLite columns carry a declared type only when they come straight from a
//! table. Expression columns are typed from the values they hold.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlparser::ast::{SetExpr, Statement as SqlStatement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row as SqlxRow, Statement as _};
use sqlx::{TypeInfo, ValueRef};
use tracing::debug;

use super::{closed_error, execution_error, fetch_capped, map_connection_error, Warehouse};
use crate::config::ConnectionConfig;
use crate::error::{Result, SqlrunError};
use crate::model::{declared_dimensions, ColumnMeta, ColumnType, ResultSet, Row, RowLimit, Value};

/// SQLite warehouse over a single connection.
#[derive(Debug)]
pub struct SqliteWarehouse {
    conn: Option<SqliteConnection>,
}

impl SqliteWarehouse {
    /// Opens the database file, creating it when missing.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let options = SqliteConnectOptions::from_str(&conn_str)
            .map_err(|e| SqlrunError::config(format!("Invalid connection string: {e}")))?
            .create_if_missing(true);

        let conn = options
            .connect()
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!(connection = %config.display_string(), "Opened SQLite database");
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.conn.as_mut().ok_or_else(closed_error)
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn describe(&mut self, sql: &str) -> Result<Vec<ColumnMeta>> {
        let conn = self.conn()?;
        let described = (&mut *conn).describe(sql).await.map_err(execution_error)?;

        let mut columns: Vec<ColumnMeta> = described
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                ColumnMeta::new(col.name(), col.type_info().name())
                    .with_nullable(described.nullable(i))
            })
            .collect();
        restore_declared_decimals(conn, sql, &mut columns).await?;
        Ok(columns)
    }

    async fn execute(&mut self, sql: &str, limit: RowLimit) -> Result<ResultSet> {
        let conn = self.conn()?;
        let prepared = (&mut *conn).prepare(sql).await.map_err(execution_error)?;
        let mut columns: Vec<ColumnMeta> = prepared
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
        restore_declared_decimals(conn, sql, &mut columns).await?;

        let column_types: Vec<ColumnType> = columns.iter().map(|c| c.column_type).collect();
        let stream = sqlx::query(sql).fetch(&mut *conn);
        let (rows, truncated) =
            fetch_capped(stream, limit, |row| convert_row(row, &column_types)).await?;

        let mut result = ResultSet::new(columns, rows)?;
        result.truncated = truncated;
        result.infer_untyped_columns();
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

fn convert_row(row: &SqliteRow, column_types: &[ColumnType]) -> Row {
    column_types
        .iter()
        .enumerate()
        .map(|(i, column_type)| convert_value(row, i, *column_type))
        .collect()
}

fn get<'r, T>(row: &'r SqliteRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Decodes a value by its declared type, falling back to its storage class.
fn convert_value(row: &SqliteRow, index: usize, column_type: ColumnType) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_uppercase(),
        _ => return Value::Null,
    };

    let typed = match column_type {
        ColumnType::Boolean => get::<bool>(row, index).map(Value::Bool),
        ColumnType::Date => get::<NaiveDate>(row, index).map(Value::Date),
        ColumnType::Time => get::<NaiveTime>(row, index).map(Value::Time),
        ColumnType::Timestamp | ColumnType::TimestampTz => {
            get::<NaiveDateTime>(row, index).map(Value::Timestamp)
        }
        ColumnType::Decimal { scale } => decimal_value(row, index, &storage, scale),
        _ => None,
    };

    typed.unwrap_or_else(|| storage_value(row, index, &storage))
}

fn decimal_value(
    row: &SqliteRow,
    index: usize,
    storage: &str,
    scale: Option<u32>,
) -> Option<Value> {
    let mut decimal = match storage {
        "INTEGER" => get::<i64>(row, index).map(Decimal::from),
        "REAL" => get::<f64>(row, index).and_then(|f| Decimal::try_from(f).ok()),
        "TEXT" => get::<String>(row, index).and_then(|s| Decimal::from_str(s.trim()).ok()),
        _ => None,
    }?;
    if let Some(scale) = scale {
        decimal.rescale(scale);
    }
    Some(Value::Decimal(decimal))
}

/// Gives scaled decimal columns back their declared `decimal(p,s)` type.
///
/// The driver cannot parse such declared types and falls back to the storage
/// class of the first row. Numeric columns are matched by name against the
/// declared types of the tables the query reads; a name declared differently
/// in two of those tables is left alone.
async fn restore_declared_decimals(
    conn: &mut SqliteConnection,
    sql: &str,
    columns: &mut [ColumnMeta],
) -> Result<()> {
    let unscaled = |c: &ColumnMeta| {
        matches!(
            c.column_type,
            ColumnType::Integer
                | ColumnType::Float
                | ColumnType::Decimal { scale: None }
                | ColumnType::Other
        )
    };
    if !columns.iter().any(unscaled) {
        return Ok(());
    }

    let mut declared: HashMap<String, Option<String>> = HashMap::new();
    for table in referenced_tables(sql) {
        let rows = sqlx::query("select name, type from pragma_table_info(?)")
            .bind(&table)
            .fetch_all(&mut *conn)
            .await
            .map_err(execution_error)?;
        for row in rows {
            let (Some(name), Some(type_name)) = (get::<String>(&row, 0), get::<String>(&row, 1))
            else {
                continue;
            };
            declared
                .entry(name.to_lowercase())
                .and_modify(|seen| {
                    if seen.as_deref().is_some_and(|t| !t.eq_ignore_ascii_case(&type_name)) {
                        *seen = None;
                    }
                })
                .or_insert(Some(type_name));
        }
    }

    for column in columns.iter_mut().filter(|c| unscaled(c)) {
        let Some(Some(type_name)) = declared.get(&column.name.to_lowercase()) else {
            continue;
        };
        let Some((precision, scale)) = declared_dimensions(type_name) else {
            continue;
        };
        let restored = ColumnMeta::new(column.name.clone(), type_name.clone());
        if matches!(restored.column_type, ColumnType::Decimal { .. }) {
            *column = restored
                .with_dimensions(None, Some(precision.into()), Some(scale.into()))
                .with_nullable(column.nullable);
        }
    }
    Ok(())
}

/// Returns the tables named in the FROM clauses of a query.
fn referenced_tables(sql: &str) -> Vec<String> {
    let Ok(statements) = Parser::parse_sql(&SQLiteDialect {}, sql) else {
        return Vec::new();
    };
    let mut tables = Vec::new();
    for statement in &statements {
        if let SqlStatement::Query(query) = statement {
            collect_tables(&query.body, &mut tables);
        }
    }
    tables
}

fn collect_tables(body: &SetExpr, tables: &mut Vec<String>) {
    match body {
        SetExpr::Select(select) => {
            for from in &select.from {
                collect_joined(from, tables);
            }
        }
        SetExpr::Query(query) => collect_tables(&query.body, tables),
        SetExpr::SetOperation { left, right, .. } => {
            collect_tables(left, tables);
            collect_tables(right, tables);
        }
        _ => {}
    }
}

fn collect_joined(from: &TableWithJoins, tables: &mut Vec<String>) {
    let factors = std::iter::once(&from.relation).chain(from.joins.iter().map(|j| &j.relation));
    for factor in factors {
        match factor {
            TableFactor::Table { name, .. } => {
                if let Some(ident) = name.0.last() {
                    tables.push(ident.value.clone());
                }
            }
            TableFactor::Derived { subquery, .. } => collect_tables(&subquery.body, tables),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => collect_joined(table_with_joins, tables),
            _ => {}
        }
    }
}

fn storage_value(row: &SqliteRow, index: usize, storage: &str) -> Value {
    let value = match storage {
        "INTEGER" | "BOOLEAN" => get::<i64>(row, index).map(Value::Int),
        "REAL" => get::<f64>(row, index).map(Value::Float),
        "BLOB" => get::<Vec<u8>>(row, index).map(Value::Bytes),
        _ => get::<String>(row, index).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}
