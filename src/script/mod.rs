//! Dataframe scripts.
//!
//! A dataframe script is a TOML document whose top-level tables are entry
//! functions. Each function describes one query over a table or a SQL body,
//! optionally narrowed by projections, filters, ordering and a row limit:
//!
//! ```toml
//! [main]
//! params = ["Session"]
//! returns = "DataFrame"
//! table = "orders"
//! select = ["id", "total * 2 AS doubled"]
//! filter = ["total > 10"]
//! order_by = ["id DESC"]
//! limit = 100
//! ```
//!
//! `params` and `returns` are optional signature annotations. When present
//! they are checked before the function is accepted.

mod dataframe;

pub use dataframe::{DataFrame, Session};

use serde::Deserialize;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default entry function name.
pub const DEFAULT_FUNCTION: &str = "main";

/// Errors raised while loading a dataframe script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The file could not be read or is not a valid script.
    #[error("script '{}' could not be loaded: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    /// The script has no entry with the requested name.
    #[error("{} does not contain '{function}' function", .path.display())]
    MissingFunction { path: PathBuf, function: String },

    /// The entry exists but is not a function table.
    #[error("'{function}' ('{}') is invalid; must be a function", .path.display())]
    NotCallable { path: PathBuf, function: String },

    /// The parameter annotation is not exactly one Session.
    #[error("invalid function '{function}' ('{}'); must accept exactly one argument of type Session", .path.display())]
    InvalidParameters { path: PathBuf, function: String },

    /// The return annotation is neither DataFrame nor str.
    #[error("invalid function '{function}' ('{}'); must return either a DataFrame or a str", .path.display())]
    InvalidReturn { path: PathBuf, function: String },
}

/// What a script function produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutput {
    /// A dataframe to evaluate.
    Frame(DataFrame),
    /// A SQL query to evaluate through [`Session::sql`].
    Sql(String),
}

impl ScriptOutput {
    /// Turns the output into a dataframe, wrapping raw SQL with the session.
    pub fn into_frame(self, session: &Session) -> DataFrame {
        match self {
            Self::Frame(df) => df,
            Self::Sql(sql) => session.sql(sql),
        }
    }
}

/// A loaded script function that can be invoked with a session.
pub trait ScriptProvider: Send + Sync + fmt::Debug {
    /// Path of the script the function was loaded from.
    fn path(&self) -> &Path;

    /// Name of the function.
    fn function(&self) -> &str;

    /// Invokes the function.
    fn invoke(&self, session: &Session) -> ScriptOutput;
}

/// Body of a script function as written in TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionDef {
    params: Option<Vec<String>>,
    returns: Option<String>,
    table: Option<String>,
    sql: Option<String>,
    #[serde(default)]
    select: Vec<String>,
    #[serde(default)]
    filter: Vec<String>,
    #[serde(default)]
    order_by: Vec<String>,
    limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnKind {
    DataFrame,
    Str,
}

/// A script function loaded from a TOML document.
#[derive(Debug)]
struct TomlFunction {
    path: PathBuf,
    function: String,
    def: FunctionDef,
    returns: ReturnKind,
}

impl ScriptProvider for TomlFunction {
    fn path(&self) -> &Path {
        &self.path
    }

    fn function(&self) -> &str {
        &self.function
    }

    fn invoke(&self, session: &Session) -> ScriptOutput {
        let mut df = match (&self.def.table, &self.def.sql) {
            (Some(table), _) => session.table(table.clone()),
            (None, Some(sql)) => session.sql(sql.clone()),
            (None, None) => session.sql(String::new()),
        };

        if !self.def.select.is_empty() {
            df = df.select(self.def.select.iter().cloned());
        }
        for predicate in &self.def.filter {
            df = df.filter(predicate.clone());
        }
        if !self.def.order_by.is_empty() {
            df = df.sort(self.def.order_by.iter().cloned());
        }
        if let Some(n) = self.def.limit {
            df = df.limit(n);
        }

        match self.returns {
            ReturnKind::DataFrame => ScriptOutput::Frame(df),
            ReturnKind::Str => ScriptOutput::Sql(df.to_sql()),
        }
    }
}

/// Loads the named function from a dataframe script.
pub fn load_script(path: &Path, function: &str) -> Result<Box<dyn ScriptProvider>, ScriptError> {
    let load_error = |message: String| ScriptError::Load {
        path: path.to_path_buf(),
        message,
    };

    let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let document: toml::Table = text.parse().map_err(|e: toml::de::Error| load_error(e.to_string()))?;
    if document.is_empty() {
        return Err(load_error("script defines no functions".to_string()));
    }

    let entry = document
        .get(function)
        .ok_or_else(|| ScriptError::MissingFunction {
            path: path.to_path_buf(),
            function: function.to_string(),
        })?;

    let toml::Value::Table(body) = entry else {
        return Err(ScriptError::NotCallable {
            path: path.to_path_buf(),
            function: function.to_string(),
        });
    };

    let def: FunctionDef = toml::Value::Table(body.clone())
        .try_into()
        .map_err(|e: toml::de::Error| load_error(format!("function '{function}': {e}")))?;

    let returns = match def.returns.as_deref() {
        None => ReturnKind::DataFrame,
        Some(r) if r.eq_ignore_ascii_case("dataframe") => ReturnKind::DataFrame,
        Some(r) if r.eq_ignore_ascii_case("str") => ReturnKind::Str,
        Some(_) => {
            return Err(ScriptError::InvalidReturn {
                path: path.to_path_buf(),
                function: function.to_string(),
            })
        }
    };

    if let Some(params) = &def.params {
        if !(params.len() == 1 && params[0].eq_ignore_ascii_case("session")) {
            return Err(ScriptError::InvalidParameters {
                path: path.to_path_buf(),
                function: function.to_string(),
            });
        }
    }

    validate_body(&def).map_err(|message| load_error(format!("function '{function}': {message}")))?;

    Ok(Box::new(TomlFunction {
        path: path.to_path_buf(),
        function: function.to_string(),
        def,
        returns,
    }))
}

/// Checks that the body names one relation and that every fragment parses.
fn validate_body(def: &FunctionDef) -> Result<(), String> {
    match (&def.table, &def.sql) {
        (Some(_), Some(_)) => return Err("'table' and 'sql' are mutually exclusive".to_string()),
        (None, None) => return Err("one of 'table' or 'sql' is required".to_string()),
        (None, Some(sql)) if sql.trim().is_empty() => return Err("'sql' is empty".to_string()),
        _ => {}
    }

    let fragment_error = |kind: &str, text: &str, e: ParserError| format!("invalid {kind} '{text}': {e}");

    if let Some(table) = &def.table {
        check_fragment(table, |p| p.parse_object_name(false).map(|_| ()))
            .map_err(|e| fragment_error("table name", table, e))?;
    }
    for item in &def.select {
        check_fragment(item, |p| p.parse_select_item().map(|_| ()))
            .map_err(|e| fragment_error("select item", item, e))?;
    }
    for predicate in &def.filter {
        check_fragment(predicate, |p| p.parse_expr().map(|_| ()))
            .map_err(|e| fragment_error("filter", predicate, e))?;
    }
    for key in &def.order_by {
        check_fragment(key, |p| p.parse_order_by_expr().map(|_| ()))
            .map_err(|e| fragment_error("sort key", key, e))?;
    }

    Ok(())
}

/// Parses `text` with `parse` and requires that nothing is left over.
fn check_fragment<F>(text: &str, parse: F) -> Result<(), ParserError>
where
    F: FnOnce(&mut Parser<'_>) -> Result<(), ParserError>,
{
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect).try_with_sql(text)?;
    parse(&mut parser)?;
    parser.expect_token(&Token::EOF)
}

/// Returns true if `path` names a dataframe script.
pub fn is_script_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
