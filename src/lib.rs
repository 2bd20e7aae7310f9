//! sqlrun - run SQL scripts in batch and export their result sets.
//!
//! This library exposes the core modules for use in integration tests.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod script;
pub mod statement;
pub mod warehouse;
