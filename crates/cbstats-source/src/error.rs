//! Error types for the cbstats-source crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for stats source operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur while discovering or querying stats sources.
#[derive(Debug, Error)]
pub enum StatsError {
    /// No archives, bundle directories or snapshot directory were found.
    #[error("no diagnostic bundles found in {}", dir.display())]
    NoBundlesFound {
        /// The working directory that was searched.
        dir: PathBuf,
    },

    /// The time range covered by a snapshot could not be determined.
    #[error("no time range available for {}: {reason}", path.display())]
    NoTimeRange {
        /// The bundle or snapshot directory.
        path: PathBuf,
        /// Why no range could be computed.
        reason: String,
    },

    /// A time range whose minimum is after its maximum.
    #[error("invalid time range: min={min}, max={max}")]
    InvalidTimeRange {
        /// Minimum POSIX timestamp in seconds.
        min: f64,
        /// Maximum POSIX timestamp in seconds.
        max: f64,
    },

    /// A compressed archive could not be read or extracted.
    #[error("archive error in {}: {reason}", path.display())]
    Archive {
        /// Path to the archive.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An HTTP request to the cluster management API failed.
    #[error("HTTP error for {url}: {reason}")]
    Http {
        /// The requested URL.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// A JSON document could not be decoded.
    #[error("json error in {context}: {reason}")]
    Json {
        /// What was being decoded.
        context: String,
        /// Description of the decode failure.
        reason: String,
    },

    /// The query server process could not be started.
    #[error("failed to launch {program}: {reason}")]
    Launch {
        /// The program that was executed.
        program: String,
        /// Description of the failure.
        reason: String,
    },

    /// A source index pushed the assigned port past the valid range.
    #[error("port overflow: base port {base} + index {index} exceeds 65535")]
    PortOverflow {
        /// The configured base port.
        base: u16,
        /// The source index.
        index: usize,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatsError {
    /// Creates an `Archive` error.
    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `NoTimeRange` error.
    pub fn no_time_range(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NoTimeRange {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Http` error.
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Json` error.
    pub fn json(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Json {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
