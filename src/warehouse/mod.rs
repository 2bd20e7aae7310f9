//! Warehouse abstraction layer for sqlrun.
//!
//! Provides a trait-based interface for statement execution, allowing
//! different database backends to be used interchangeably.

mod mock;
mod postgres;
mod sqlite;

pub use mock::MockWarehouse;
pub use postgres::PostgresWarehouse;
pub use sqlite::SqliteWarehouse;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};

use crate::config::ConnectionConfig;
use crate::error::{Result, SqlrunError};
use crate::model::{ColumnMeta, ResultSet, Row, RowLimit};

/// Supported warehouse backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl WarehouseBackend {
    /// Returns the backend name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string or URL scheme.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend. File based backends have none.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }

    /// Returns the URL scheme for this backend.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Opens a warehouse connection for the given configuration.
///
/// This is the central factory function for connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn Warehouse>> {
    match config.backend {
        WarehouseBackend::Postgres => {
            let warehouse = PostgresWarehouse::connect(config).await?;
            Ok(Box::new(warehouse))
        }
        WarehouseBackend::Sqlite => {
            let warehouse = SqliteWarehouse::connect(config).await?;
            Ok(Box::new(warehouse))
        }
    }
}

/// A single connection that runs statements one at a time.
#[async_trait]
pub trait Warehouse: Send {
    /// Returns the result columns of `sql` without fetching any rows.
    async fn describe(&mut self, sql: &str) -> Result<Vec<ColumnMeta>>;

    /// Executes `sql` and returns at most `limit` rows.
    ///
    /// Statements without a result set report the number of affected rows.
    async fn execute(&mut self, sql: &str, limit: RowLimit) -> Result<ResultSet>;

    /// Closes the connection. Later calls fail with a connection error.
    async fn close(&mut self) -> Result<()>;
}

/// Drains `rows` until the cap is exceeded by one row.
///
/// Returns the converted rows and whether any were left behind.
pub(crate) async fn fetch_capped<R, S, F>(
    mut rows: S,
    limit: RowLimit,
    mut convert: F,
) -> Result<(Vec<Row>, bool)>
where
    S: Stream<Item = std::result::Result<R, sqlx::Error>> + Unpin,
    F: FnMut(&R) -> Row,
{
    let max = limit.max_rows();
    let mut out = Vec::new();

    while let Some(row) = rows.try_next().await.map_err(execution_error)? {
        if max.is_some_and(|max| out.len() >= max) {
            return Ok((out, true));
        }
        out.push(convert(&row));
    }

    Ok((out, false))
}

pub(crate) fn closed_error() -> SqlrunError {
    SqlrunError::connection("Connection is closed")
}

/// Determines if an error is transient and worth retrying.
pub(crate) fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
    {
        return true;
    }

    // Authentication, TLS and missing-database errors never heal on retry
    false
}

/// Maps sqlx connection errors to user-friendly messages.
pub(crate) fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> SqlrunError {
    let database = config.database.as_deref().unwrap_or("unknown");
    let error_str = error.to_string().to_lowercase();

    if config.backend == WarehouseBackend::Sqlite {
        return if error_str.contains("unable to open") {
            SqlrunError::connection(format!("Cannot open SQLite database '{database}'."))
        } else {
            SqlrunError::connection(error.to_string())
        };
    }

    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port.unwrap_or_else(|| config.backend.default_port());
    let user = config.user.as_deref().unwrap_or("unknown");

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SqlrunError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SqlrunError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SqlrunError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        SqlrunError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.",
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlrunError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SqlrunError::connection(error.to_string())
    }
}

/// Converts a statement failure into an execution error, keeping the
/// PostgreSQL detail and hint fields when present.
pub(crate) fn execution_error(error: sqlx::Error) -> SqlrunError {
    SqlrunError::execution(format_query_error(error))
}

fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let fields = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
            ("CONSTRAINT", pg_error.constraint()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                result.push_str(&format!("\n  {label}: {value}"));
            }
        }
    }

    result
}
