//! # cbstats-cli
//!
//! Command-line interface for Couchbase stats source discovery.
//!
//! Lists the stats sources found in a directory of diagnostic bundles, or
//! the nodes of a running cluster, with their buckets and time ranges.
//! With `--start` it launches a query server for every archived source.
//!
//! ```text
//! $ cbstats --work-dir /data/case
//! NAME            URL                      TIME RANGE (UTC)                          BUCKETS
//! node-1@nodeA    http://127.0.0.1:9090/   2021-03-01 00:00:00 .. 2021-03-01 01:00:00  beer-sample,travel-sample
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod discover;
pub mod error;
pub mod output;

pub use cli::{Cli, Format};
pub use discover::DiscoverCommand;
pub use error::CliError;
pub use output::OutputFormat;
