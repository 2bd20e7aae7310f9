//! Runs sources statement by statement over one warehouse connection.

use tracing::{debug, info};

use super::{BatchOptions, ErrorPolicy, Mode, Reporter, RunSummary};
use crate::error::Result;
use crate::export::Sink;
use crate::model::ResultSet;
use crate::script::Session;
use crate::statement::{Source, Statement};
use crate::warehouse::Warehouse;

/// How a source ended.
enum SourceEnd {
    Completed,
    Skipped,
    Aborted,
}

/// Drives a batch run.
pub struct BatchExecutor<'a> {
    warehouse: &'a mut dyn Warehouse,
    options: &'a BatchOptions,
    reporter: &'a dyn Reporter,
    session: Session,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        warehouse: &'a mut dyn Warehouse,
        options: &'a BatchOptions,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            warehouse,
            options,
            reporter,
            session: Session::new(),
        }
    }

    /// Runs every source in order.
    ///
    /// Statement failures are reported and counted; only connection, sink
    /// and internal errors end the run with an error.
    pub async fn run(&mut self, sources: &[Source], sink: &mut Sink) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for source in sources {
            let mut own = self.options.source_sink(source)?;
            if let Some(path) = self.options.output_path(source) {
                info!(path = %path.display(), "Writing source output");
            }

            let end = {
                let target = own.as_mut().unwrap_or(&mut *sink);
                self.run_source(source, target, &mut summary).await?
            };

            if let Some(own) = own {
                own.finish()?;
            }

            match end {
                SourceEnd::Completed => {}
                SourceEnd::Skipped => summary.skipped_sources += 1,
                SourceEnd::Aborted => {
                    summary.aborted = true;
                    break;
                }
            }
        }

        Ok(summary)
    }

    async fn run_source(
        &mut self,
        source: &Source,
        sink: &mut Sink,
        summary: &mut RunSummary,
    ) -> Result<SourceEnd> {
        if let Some(name) = source.name() {
            debug!(source = %name, "Running source");
        }

        for statement in source.statements(&self.session) {
            summary.executed += 1;
            if self.run_statement(&statement, source.is_frame(), sink).await? {
                continue;
            }

            summary.failed += 1;
            match self.options.policy {
                ErrorPolicy::Continue => {}
                ErrorPolicy::SkipFile => {
                    debug!("Skipping the rest of the source");
                    return Ok(SourceEnd::Skipped);
                }
                ErrorPolicy::Stop => {
                    debug!("Stopping after failed statement");
                    return Ok(SourceEnd::Aborted);
                }
            }
        }

        Ok(SourceEnd::Completed)
    }

    /// Runs one statement. Returns false when it failed recoverably.
    async fn run_statement(
        &mut self,
        statement: &Statement,
        is_frame: bool,
        sink: &mut Sink,
    ) -> Result<bool> {
        if self.options.mode == Mode::ShowSql {
            sink.write_line(&statement.terminated())?;
            return Ok(true);
        }

        if self.options.echo {
            sink.separate()?;
            sink.write_line(statement.text.trim_end())?;
        }

        let result = match self.options.mode {
            Mode::Describe => self.describe(statement, is_frame).await,
            _ => {
                self.warehouse
                    .execute(statement.sql_text(), self.options.limit)
                    .await
            }
        };

        let result = match result {
            Ok(result) => result,
            Err(e) if e.is_recoverable() => {
                self.reporter.statement_failed(statement, &e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if result.truncated {
            self.reporter.rows_truncated(statement, self.options.limit.0);
        }

        let result = if self.options.pretty {
            result.with_pretty_headers()
        } else {
            result
        };

        if !self.options.echo {
            sink.separate()?;
        }
        self.options.exporter.export(&result, sink)?;
        Ok(true)
    }

    async fn describe(&mut self, statement: &Statement, is_frame: bool) -> Result<ResultSet> {
        let columns = self.warehouse.describe(statement.sql_text()).await?;
        Ok(if is_frame {
            ResultSet::describe_frame(&columns)
        } else {
            ResultSet::describe_sql(&columns)
        })
    }
}
