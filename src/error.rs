//! Error types for sqlrun.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

use crate::script::ScriptError;

/// Main error type for sqlrun operations.
#[derive(Error, Debug)]
pub enum SqlrunError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution errors reported by the database (syntax, permissions, etc.)
    #[error("Execution error: {0}")]
    Execution(String),

    /// Dataframe script loading errors.
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Configuration errors (bad arguments, invalid config file, missing inputs, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output errors (cannot open or write an output file, missing destination, etc.)
    #[error("Output error: {0}")]
    Sink(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlrunError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an output error with the given message.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Execution(_) => "Execution Error",
            Self::Script(_) => "Script Error",
            Self::Config(_) => "Configuration Error",
            Self::Sink(_) => "Output Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for errors the batch executor recovers from under its error policy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

/// Result type alias using SqlrunError.
pub type Result<T> = std::result::Result<T, SqlrunError>;
