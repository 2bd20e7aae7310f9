//! Logging configuration for sqlrun.
//!
//! Logs go to stderr so that stdout only carries rendered results.

use tracing_subscriber::EnvFilter;

/// Returns the default filter for the given `-v` count.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initializes logging to stderr.
///
/// `RUST_LOG` wins over the verbosity count when it is set.
pub fn init_stderr_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
