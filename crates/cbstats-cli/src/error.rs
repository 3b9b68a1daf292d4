//! CLI error types.

use thiserror::Error;

use cbstats_source::StatsError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Source discovery or configuration failed.
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// Discovery succeeded but found nothing to report.
    #[error("no stats sources found: {0}")]
    NoSources(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
