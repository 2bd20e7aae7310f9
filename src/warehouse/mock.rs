//! Mock warehouse for testing.
//!
//! Answers literal `SELECT`s and reads from registered in-memory tables, so
//! batch runs can be exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlparser::ast::{
    Expr, SelectItem, SetExpr, Statement as SqlStatement, TableFactor, UnaryOperator,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::{closed_error, Warehouse};
use crate::error::{Result, SqlrunError};
use crate::model::{ColumnMeta, ColumnType, ResultSet, RowLimit, Value};

/// A mock warehouse that returns predefined results.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    tables: HashMap<String, ResultSet>,
    failures: Vec<String>,
    executed: Vec<String>,
    closed: bool,
}

impl MockWarehouse {
    /// Creates a mock warehouse with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table answered by `select ... from NAME`.
    pub fn with_table(mut self, name: &str, rows: ResultSet) -> Self {
        self.tables.insert(name.to_lowercase(), rows);
        self
    }

    /// Makes every statement containing `needle` fail with an execution error.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn answer(&self, sql: &str) -> Result<ResultSet> {
        if let Some(needle) = self.failures.iter().find(|n| sql.contains(n.as_str())) {
            return Err(SqlrunError::execution(format!(
                "mock failure on '{needle}': {sql}"
            )));
        }

        let statements = Parser::parse_sql(&GenericDialect {}, sql)
            .map_err(|e| SqlrunError::execution(e.to_string()))?;

        let Some(SqlStatement::Query(query)) = statements.first() else {
            return Ok(ResultSet::status(0));
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Ok(ResultSet::status(0));
        };

        if let Some(from) = select.from.first() {
            let TableFactor::Table { name, .. } = &from.relation else {
                return Err(SqlrunError::execution("mock supports plain table scans only"));
            };
            let key = name.to_string().to_lowercase();
            return self.tables.get(&key).cloned().ok_or_else(|| {
                SqlrunError::execution(format!("relation \"{key}\" does not exist"))
            });
        }

        let mut columns = Vec::with_capacity(select.projection.len());
        let mut row = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            let (expr, name) = match item {
                SelectItem::UnnamedExpr(expr) => (expr, expr.to_string()),
                SelectItem::ExprWithAlias { expr, alias } => (expr, alias.value.clone()),
                _ => return Err(SqlrunError::execution("wildcard needs a FROM clause")),
            };
            let value = literal(expr)?;
            let column_type = value.column_type().unwrap_or(ColumnType::Other);
            columns.push(ColumnMeta::typed(name, column_type).with_nullable(Some(value.is_null())));
            row.push(value);
        }

        ResultSet::new(columns, vec![row])
    }
}

/// Evaluates a literal projection.
fn literal(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Value(value) => Ok(match value {
            SqlValue::Number(n, _) => n
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| n.parse::<f64>().map(Value::Float))
                .map_err(|e| SqlrunError::execution(format!("bad number '{n}': {e}")))?,
            SqlValue::SingleQuotedString(s) => Value::String(s.clone()),
            SqlValue::Boolean(b) => Value::Bool(*b),
            SqlValue::Null => Value::Null,
            other => Value::String(other.to_string()),
        }),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(SqlrunError::execution(format!("cannot negate {other:?}"))),
        },
        Expr::Nested(inner) => literal(inner),
        other => Err(SqlrunError::execution(format!(
            "mock cannot evaluate '{other}'"
        ))),
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn describe(&mut self, sql: &str) -> Result<Vec<ColumnMeta>> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(self.answer(sql)?.columns)
    }

    async fn execute(&mut self, sql: &str, limit: RowLimit) -> Result<ResultSet> {
        if self.closed {
            return Err(closed_error());
        }
        self.executed.push(sql.to_string());

        let mut result = self.answer(sql)?;
        if let Some(max) = limit.max_rows() {
            result.truncate(max);
        }
        Ok(result)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
