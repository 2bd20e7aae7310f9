//! Batch execution of statement sources.
//!
//! A batch is an ordered list of [`Source`]s run over one warehouse
//! connection. The [`ErrorPolicy`] decides what happens after a statement
//! fails and the [`Mode`] decides what is done with each statement.

mod executor;
mod reporter;

pub use executor::BatchExecutor;
pub use reporter::{Reporter, TracingReporter};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlrunError};
use crate::export::{Exporter, Sink};
use crate::model::RowLimit;
use crate::script::Session;
use crate::statement::Source;

/// Row cap used when neither the command line nor the config sets one.
pub const DEFAULT_LIMIT: u64 = 500;

/// What to do after a statement fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// End the whole run.
    #[default]
    Stop,
    /// Run the remaining statements.
    Continue,
    /// Drop the rest of the failing source and go on with the next one.
    SkipFile,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Continue => "continue",
            Self::SkipFile => "skip-file",
        }
    }
}

/// What the executor does with each statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Execute and render the result.
    #[default]
    Export,
    /// Print the statement text only.
    ShowSql,
    /// Render the result columns without fetching rows.
    Describe,
}

/// Options shared by every statement of a run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub policy: ErrorPolicy,
    pub limit: RowLimit,
    pub mode: Mode,
    pub exporter: Exporter,
    /// Humanize column headers.
    pub pretty: bool,
    /// Print each statement before its result.
    pub echo: bool,
    /// Directory receiving one output file per file source.
    pub out_dir: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::default(),
            limit: RowLimit(DEFAULT_LIMIT),
            mode: Mode::default(),
            exporter: Exporter::default(),
            pretty: false,
            echo: true,
            out_dir: None,
        }
    }
}

impl BatchOptions {
    /// Returns the per-source output file for `source`, if the run has an
    /// output directory and the source comes from a file.
    pub fn output_path(&self, source: &Source) -> Option<PathBuf> {
        let dir = self.out_dir.as_deref()?;
        let stem = source.output_stem()?;
        Some(output_file(dir, &stem, self.exporter.format().output_extension()))
    }

    /// Opens the per-source sink for `source`, if it gets one.
    pub(crate) fn source_sink(&self, source: &Source) -> Result<Option<Sink>> {
        self.output_path(source)
            .map(|path| Sink::create(self.exporter.format(), Some(&path)))
            .transpose()
    }
}

fn output_file(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!("{stem}.{extension}"))
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Statements sent to the warehouse (or printed, for show-sql).
    pub executed: usize,
    /// Statements that failed.
    pub failed: usize,
    /// Sources abandoned under `skip-file`.
    pub skipped_sources: usize,
    /// Whether the run ended early under `stop`.
    pub aborted: bool,
}

impl RunSummary {
    /// Returns true if every statement succeeded.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Returns the process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Prints every statement of every source, each ending in `;`.
///
/// Nothing is executed, so no warehouse is needed. Spreadsheet output has
/// nowhere to put the text and is rejected.
pub fn show_sql(sources: &[Source], options: &BatchOptions, sink: &mut Sink) -> Result<RunSummary> {
    let format = options.exporter.format();
    if format.is_spreadsheet() {
        return Err(SqlrunError::config(format!(
            "--show-sql cannot write to the {format} format"
        )));
    }

    let session = Session::new();
    let mut summary = RunSummary::default();

    for source in sources {
        let mut own = options.source_sink(source)?;
        let target = own.as_mut().unwrap_or(&mut *sink);
        for statement in source.statements(&session) {
            target.write_line(&statement.terminated())?;
            summary.executed += 1;
        }
        if let Some(own) = own {
            own.finish()?;
        }
    }

    Ok(summary)
}
