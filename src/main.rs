//! sqlrun - run SQL scripts in batch and export their result sets.

use std::path::Path;
use std::process::ExitCode;

use sqlrun::batch::{self, BatchExecutor, BatchOptions, Mode, RunSummary, TracingReporter};
use sqlrun::cli::Cli;
use sqlrun::config::Config;
use sqlrun::error::Result;
use sqlrun::export::{ExportFormat, Sink};
use sqlrun::logging;
use sqlrun::statement::Source;
use sqlrun::warehouse;
use tracing::{debug, error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads DATABASE_URL
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    match run(&cli).await {
        Ok(summary) => {
            debug!(?summary, "Run finished");
            if summary.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(category = e.category(), "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunSummary> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let options = cli.batch_options(&config)?;
    let sources = cli.sources(|| std::io::read_to_string(std::io::stdin()))?;

    let (format, path) = cli.output(&config);

    if options.mode == Mode::ShowSql {
        let mut sink = open_sink(format, path.as_deref(), &options, &sources)?;
        let summary = batch::show_sql(&sources, &options, &mut sink)?;
        sink.finish()?;
        return Ok(summary);
    }

    // the output file is only truncated once connected
    let connection = config.resolve_connection(cli.connection.as_deref(), cli.url.as_deref())?;
    info!("Connecting to {}", connection.display_string());
    let mut warehouse = warehouse::connect(&connection).await?;

    let outcome = match open_sink(format, path.as_deref(), &options, &sources) {
        Ok(mut sink) => {
            let reporter = TracingReporter;
            let ran = BatchExecutor::new(warehouse.as_mut(), &options, &reporter)
                .run(&sources, &mut sink)
                .await;
            ran.map(|summary| (summary, sink))
        }
        Err(e) => Err(e),
    };

    if let Err(e) = warehouse.close().await {
        warn!("{}", e);
    }

    let (summary, sink) = outcome?;
    sink.finish()?;
    Ok(summary)
}

/// Opens the run's default sink.
///
/// A spreadsheet run whose sources all write to `--out-dir` never uses the
/// default sink, so it does not need an output file.
fn open_sink(
    format: ExportFormat,
    path: Option<&Path>,
    options: &BatchOptions,
    sources: &[Source],
) -> Result<Sink> {
    let all_redirected = sources.iter().all(|s| options.output_path(s).is_some());
    if format.is_spreadsheet() && path.is_none() && all_redirected {
        return Ok(Sink::stdout());
    }
    Sink::create(format, path)
}
