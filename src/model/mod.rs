//! Row/column model shared by every warehouse and exporter.
//!
//! A `ResultSet` is an ordered list of rows plus parallel column metadata.
//! Warehouses produce it, exporters consume it.

mod result;
mod value;

pub use result::{prettify_header, ResultSet};
pub use value::{Row, Value};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a result column, derived from the driver's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Decimal {
        scale: Option<u32>,
    },
    Float,
    Boolean,
    #[default]
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Binary,
    Json,
    /// Types without a dedicated rendering (arrays, ranges, NULL literals...).
    Other,
}

/// Horizontal alignment of a rendered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

impl ColumnType {
    /// Maps a PostgreSQL or SQLite type name to a column type.
    pub fn from_type_name(name: &str) -> Self {
        let upper = name.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();

        match base {
            "INT2" | "INT4" | "INT8" | "SMALLINT" | "INT" | "INTEGER" | "BIGINT" | "SERIAL"
            | "BIGSERIAL" | "OID" => Self::Integer,
            "NUMERIC" | "DECIMAL" | "MONEY" => Self::Decimal {
                scale: declared_dimensions(&upper).map(|(_, scale)| scale),
            },
            "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" | "DOUBLE" | "FLOAT" => Self::Float,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CHARACTER VARYING" | "CITEXT"
            | "UUID" => Self::Text,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" => Self::Timestamp,
            "TIMESTAMPTZ" => Self::TimestampTz,
            "BYTEA" | "BLOB" => Self::Binary,
            "JSON" | "JSONB" => Self::Json,
            _ => Self::Other,
        }
    }

    /// Returns true for integer, decimal and floating point columns.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal { .. } | Self::Float)
    }

    /// Returns the display alignment for this type.
    ///
    /// Numbers are right aligned, booleans and temporal values centered,
    /// everything else left aligned.
    pub fn alignment(&self) -> Align {
        match self {
            Self::Integer | Self::Decimal { .. } | Self::Float => Align::Right,
            Self::Boolean | Self::Date | Self::Time | Self::Timestamp | Self::TimestampTz => {
                Align::Center
            }
            Self::Text | Self::Binary | Self::Json | Self::Other => Align::Left,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Decimal { scale: Some(s) } => write!(f, "DECIMAL(*,{s})"),
            Self::Decimal { scale: None } => write!(f, "DECIMAL"),
            Self::Float => write!(f, "FLOAT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Text => write!(f, "TEXT"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::TimestampTz => write!(f, "TIMESTAMPTZ"),
            Self::Binary => write!(f, "BINARY"),
            Self::Json => write!(f, "JSON"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// Extracts precision and scale from a declared type such as `DECIMAL(6,4)`.
pub(crate) fn declared_dimensions(declared: &str) -> Option<(u32, u32)> {
    let args = declared.split_once('(')?.1.trim_end().strip_suffix(')')?;
    let (precision, scale) = args.split_once(',')?;
    Some((precision.trim().parse().ok()?, scale.trim().parse().ok()?))
}

/// Row cap applied to every statement. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowLimit(pub u64);

impl RowLimit {
    /// No cap.
    pub const UNLIMITED: RowLimit = RowLimit(0);

    /// Returns the maximum number of rows to keep, or `None` when unlimited.
    pub fn max_rows(&self) -> Option<usize> {
        (self.0 > 0).then(|| usize::try_from(self.0).unwrap_or(usize::MAX))
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as reported by the database.
    pub name: String,

    /// Driver type name (e.g. `INT8`, `TEXT`).
    pub type_name: String,

    /// Semantic type used by the exporters.
    pub column_type: ColumnType,

    /// Internal size, when the driver reports it.
    pub size: Option<i64>,

    /// Numeric precision, when the driver reports it.
    pub precision: Option<i64>,

    /// Numeric scale, when the driver reports it.
    pub scale: Option<i64>,

    /// Nullability, when the driver can infer it.
    pub nullable: Option<bool>,
}

impl ColumnMeta {
    /// Creates column metadata from a name and a driver type name.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let column_type = ColumnType::from_type_name(&type_name);
        Self {
            name: name.into(),
            type_name,
            column_type,
            ..Default::default()
        }
    }

    /// Creates column metadata with an explicit semantic type.
    pub fn typed(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            type_name: column_type.to_string(),
            column_type,
            ..Default::default()
        }
    }

    /// Sets the nullability flag.
    pub fn with_nullable(mut self, nullable: Option<bool>) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets size, precision and scale.
    pub fn with_dimensions(
        mut self,
        size: Option<i64>,
        precision: Option<i64>,
        scale: Option<i64>,
    ) -> Self {
        self.size = size;
        self.precision = precision;
        self.scale = scale;
        self
    }
}
