//! CLI support for sift-lang
//!
//! Runs one query operation over a JSON document, so the binary stays a thin
//! argument-parsing shell and the same path can be driven from tests.

mod run;

pub use run::{Operation, RunOptions, execute, execute_with, parse_then};

use std::io;

use thiserror::Error;

use crate::QueryError;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
