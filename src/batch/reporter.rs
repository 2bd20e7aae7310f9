//! Diagnostics raised while a batch runs.

use tracing::{error, warn};

use crate::error::SqlrunError;
use crate::statement::Statement;

/// Receives the events a batch run reports instead of returning.
pub trait Reporter {
    /// A statement failed and the error policy decides what happens next.
    fn statement_failed(&self, statement: &Statement, error: &SqlrunError);

    /// A result was cut to `limit` rows.
    fn rows_truncated(&self, statement: &Statement, limit: u64);
}

/// Reports through `tracing`, so events land on stderr with everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn statement_failed(&self, statement: &Statement, error: &SqlrunError) {
        match &statement.name {
            Some(name) => error!(source = %name, "{}", error),
            None => error!("{}", error),
        }
    }

    fn rows_truncated(&self, statement: &Statement, limit: u64) {
        match &statement.name {
            Some(name) => warn!(source = %name, "data truncated after {} rows", limit),
            None => warn!("data truncated after {} rows", limit),
        }
    }
}
