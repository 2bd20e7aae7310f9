//! Statements and the sources they come from.

mod splitter;

pub use splitter::split_statements;

use std::path::{Path, PathBuf};

use crate::error::{Result, SqlrunError};
use crate::script::{self, ScriptProvider, Session};

/// Where a statement's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Plain SQL text.
    Sql,
    /// A query generated by a dataframe script.
    DataFrame,
}

/// One unit of work for the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Name of the source the statement belongs to, if any.
    pub name: Option<String>,
    /// Statement text as written (or generated).
    pub text: String,
    /// How the text was produced.
    pub origin: Origin,
}

impl Statement {
    /// Creates a SQL statement.
    pub fn sql(name: Option<String>, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
            origin: Origin::Sql,
        }
    }

    /// Creates a statement generated by a dataframe.
    pub fn dataframe(name: Option<String>, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
            origin: Origin::DataFrame,
        }
    }

    /// Returns the text without its terminator, as sent to the warehouse.
    pub fn sql_text(&self) -> &str {
        self.text.trim_end().trim_end_matches(';').trim_end()
    }

    /// Returns the text with exactly one `;` terminator.
    pub fn terminated(&self) -> String {
        format!("{};", self.sql_text())
    }
}

/// An input to a batch run, resolved before any connection is opened.
#[derive(Debug)]
pub enum Source {
    /// A SQL script file.
    File { path: PathBuf, text: String },
    /// SQL read from standard input.
    Stdin { text: String },
    /// An inline `-q` query, which may hold several statements.
    Query(String),
    /// A `-t` table name.
    Table(String),
    /// A dataframe script function.
    Frame { provider: Box<dyn ScriptProvider> },
}

impl Source {
    /// Resolves a file argument.
    ///
    /// `*.toml` files are dataframe scripts and are loaded with the given
    /// entry function. Everything else is read as SQL text.
    pub fn from_path(path: &Path, function: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(SqlrunError::config(format!(
                "'{}' is not an existing file",
                path.display()
            )));
        }

        if script::is_script_path(path) {
            let provider = script::load_script(path, function)?;
            return Ok(Source::Frame { provider });
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SqlrunError::config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Ok(Source::File {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Returns the source's name: the file stem for files and scripts.
    pub fn name(&self) -> Option<String> {
        match self {
            Source::File { path, .. } => file_stem(path),
            Source::Frame { provider } => file_stem(provider.path()),
            Source::Stdin { .. } => Some("stdin".to_string()),
            Source::Query(_) | Source::Table(_) => None,
        }
    }

    /// Returns the file stem used for per-source output files.
    pub fn output_stem(&self) -> Option<String> {
        match self {
            Source::File { .. } | Source::Frame { .. } => self.name(),
            _ => None,
        }
    }

    /// Expands the source into its statements, lazily for SQL text.
    pub fn statements<'a>(
        &'a self,
        session: &Session,
    ) -> Box<dyn Iterator<Item = Statement> + 'a> {
        let name = self.name();
        match self {
            Source::File { text, .. } | Source::Stdin { text } | Source::Query(text) => Box::new(
                split_statements(text).map(move |s| Statement::sql(name.clone(), s)),
            ),
            Source::Table(table) => Box::new(std::iter::once(Statement::sql(
                name,
                format!("select * from {table}"),
            ))),
            Source::Frame { provider } => {
                let df = provider.invoke(session).into_frame(session);
                let statements: Vec<Statement> = df
                    .queries()
                    .into_iter()
                    .map(|q| Statement::dataframe(name.clone(), q))
                    .collect();
                Box::new(statements.into_iter())
            }
        }
    }

    /// Returns true for dataframe sources.
    pub fn is_frame(&self) -> bool {
        matches!(self, Source::Frame { .. })
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
