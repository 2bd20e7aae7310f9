//! Result sets.

use serde::{Deserialize, Serialize};

use super::{ColumnMeta, ColumnType, Row, Value};
use crate::error::{Result, SqlrunError};

/// Represents the rows returned by one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    /// Column metadata, one entry per value in every row.
    pub columns: Vec<ColumnMeta>,

    /// Rows of data.
    pub rows: Vec<Row>,

    /// Whether rows were dropped by the row cap.
    #[serde(default)]
    pub truncated: bool,
}

impl ResultSet {
    /// Creates a result set, checking that every row matches the column count.
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(SqlrunError::internal(format!(
                "row {} has {} values but the result has {} columns",
                index + 1,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self {
            columns,
            rows,
            truncated: false,
        })
    }

    /// Creates a result set with columns and no rows.
    pub fn empty(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            truncated: false,
        }
    }

    /// Creates the one-row result reported for statements without a result set.
    pub fn status(rows_affected: u64) -> Self {
        Self {
            columns: vec![ColumnMeta::typed("rows affected", ColumnType::Integer)],
            rows: vec![vec![Value::Int(rows_affected as i64)]],
            truncated: false,
        }
    }

    /// Builds the describe listing for a SQL statement.
    pub fn describe_sql(columns: &[ColumnMeta]) -> Self {
        let header = vec![
            ColumnMeta::typed("Name", ColumnType::Text),
            ColumnMeta::typed("Type", ColumnType::Text),
            ColumnMeta::typed("Size", ColumnType::Integer),
            ColumnMeta::typed("Prec", ColumnType::Integer),
            ColumnMeta::typed("Scale", ColumnType::Integer),
            ColumnMeta::typed("Nulls?", ColumnType::Boolean),
        ];
        let rows = columns
            .iter()
            .map(|c| {
                vec![
                    Value::String(c.name.clone()),
                    Value::String(c.type_name.clone()),
                    c.size.into(),
                    c.precision.into(),
                    c.scale.into(),
                    c.nullable.into(),
                ]
            })
            .collect();

        Self {
            columns: header,
            rows,
            truncated: false,
        }
    }

    /// Builds the describe listing for a dataframe.
    pub fn describe_frame(columns: &[ColumnMeta]) -> Self {
        let header = vec![
            ColumnMeta::typed("Name", ColumnType::Text),
            ColumnMeta::typed("Type", ColumnType::Text),
            ColumnMeta::typed("Nulls?", ColumnType::Boolean),
        ];
        let rows = columns
            .iter()
            .map(|c| {
                vec![
                    Value::String(c.name.clone()),
                    Value::String(c.type_name.clone()),
                    c.nullable.into(),
                ]
            })
            .collect();

        Self {
            columns: header,
            rows,
            truncated: false,
        }
    }

    /// Returns the column names in order.
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Keeps at most `limit` rows and marks the result truncated if rows were dropped.
    pub fn truncate(&mut self, limit: usize) {
        if self.rows.len() > limit {
            self.rows.truncate(limit);
            self.truncated = true;
        }
    }

    /// Gives untyped columns the type of their first non-null value.
    ///
    /// Drivers report expression columns without a declared type this way.
    pub fn infer_untyped_columns(&mut self) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            if column.column_type != ColumnType::Other {
                continue;
            }
            let inferred = self
                .rows
                .iter()
                .find_map(|row| row.get(i).and_then(Value::column_type));
            if let Some(column_type) = inferred {
                column.column_type = column_type;
            }
        }
    }

    /// Replaces every column name with its humanized form.
    pub fn with_pretty_headers(mut self) -> Self {
        for column in &mut self.columns {
            column.name = prettify_header(&column.name);
        }
        self
    }
}

/// Humanizes a column name: underscores become spaces and each word is title-cased.
///
/// A letter is upper-cased when the preceding character is not a letter and
/// lower-cased otherwise.
pub fn prettify_header(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;

    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }

    out
}
