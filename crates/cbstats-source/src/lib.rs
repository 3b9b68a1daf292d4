//! # cbstats-source
//!
//! Discovery of Couchbase stats sources.
//!
//! A stats source is one node's time-series stats, served over the
//! Prometheus query API. It is either an archived diagnostic bundle, served
//! by a locally launched query server, or a node of a running cluster.
//!
//! This crate provides:
//!
//! - [`ArchiveLocator`]: Finds bundle directories and extracts them from zip archives
//! - [`parse_config_log`]: Reads bucket names from a bundle's config dump
//! - [`assign_names`]: Short, unique display names for bundle directories
//! - [`snapshot_time_range`]: Time span covered by a bundle's snapshot
//! - [`StatsSource`]: The common interface, implemented by
//!   [`ArchivedSource`] and [`LiveSource`]
//! - [`ToolConfig`]: TOML configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cbstats_source::{
//!     QueryServerConfig, StatsSource, discover_archived_sources, overall_time_range,
//! };
//!
//! let sources = discover_archived_sources(Path::new("."), 9090, &QueryServerConfig::default())?;
//! for source in &sources {
//!     println!("{} {:?}", source.short_name(), source.list_buckets().names());
//! }
//! let range = overall_time_range(sources.iter().map(|s| s as &dyn StatsSource))?;
//! println!("{range}");
//! # Ok::<(), cbstats_source::StatsError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod archived;
pub mod client;
pub mod config;
pub mod config_log;
pub mod error;
pub mod launcher;
pub mod live;
pub mod naming;
pub mod source;
pub mod time_range;
pub mod types;

// Re-export main types
pub use archive::{ArchiveLocator, ExtractionStats, SNAPSHOT_DIR_NAME};
pub use archived::{ArchivedSource, discover_archived_sources, source_port};
pub use client::ClusterClient;
pub use config::{ClusterConfig, ToolConfig};
pub use config_log::{parse_config_log, parse_config_text};
pub use error::{Result, StatsError};
pub use launcher::{QueryServerConfig, ServerProcess};
pub use live::LiveSource;
pub use naming::{DirectoryNameCandidate, NameFormat, assign_names};
pub use source::{StatsSource, start_all};
pub use time_range::{overall_time_range, snapshot_time_range};
pub use types::{BucketConfig, Credentials, TimeRange};
