//! Time range estimation from snapshot shard metadata.
//!
//! A stats snapshot holds one directory per storage shard, each with a
//! `meta.json` recording the first and last sample time in milliseconds.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::archive::SNAPSHOT_DIR_NAME;
use crate::error::{Result, StatsError};
use crate::source::StatsSource;
use crate::types::TimeRange;

/// Name of the per-shard metadata file.
pub const SHARD_META_FILE: &str = "meta.json";

/// The fields of a shard's `meta.json` that matter here.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardMeta {
    /// Earliest sample time, in milliseconds.
    pub min_time: i64,
    /// Latest sample time, in milliseconds.
    pub max_time: i64,
}

/// Lists the shard metadata files under `<bundle_dir>/stats_snapshot/*/`, sorted.
///
/// # Errors
///
/// Returns an error if the snapshot directory cannot be read.
pub fn shard_meta_files(bundle_dir: &Path) -> Result<Vec<PathBuf>> {
    let snapshot = bundle_dir.join(SNAPSHOT_DIR_NAME);
    let mut files = Vec::new();
    for entry in fs::read_dir(&snapshot)? {
        let meta = entry?.path().join(SHARD_META_FILE);
        if meta.is_file() {
            files.push(meta);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads one shard metadata file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn read_shard_meta(path: &Path) -> Result<ShardMeta> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| StatsError::json(path.display().to_string(), e))
}

/// Computes the range covered by every shard in a bundle's snapshot.
///
/// # Errors
///
/// Returns `StatsError::NoTimeRange` if the snapshot has no shard metadata
/// or any metadata file is unreadable or inconsistent.
pub fn snapshot_time_range(bundle_dir: &Path) -> Result<TimeRange> {
    let files = shard_meta_files(bundle_dir)
        .map_err(|e| StatsError::no_time_range(bundle_dir, e.to_string()))?;

    let mut range: Option<TimeRange> = None;
    for file in &files {
        let meta = read_shard_meta(file)
            .map_err(|e| StatsError::no_time_range(bundle_dir, e.to_string()))?;
        let shard = TimeRange::from_millis(meta.min_time, meta.max_time)
            .map_err(|e| StatsError::no_time_range(file, e.to_string()))?;
        range = Some(range.map_or(shard, |r| r.union(shard)));
    }

    let range = range
        .ok_or_else(|| StatsError::no_time_range(bundle_dir, "no shard metadata files"))?;
    debug!(dir = %bundle_dir.display(), shards = files.len(), %range, "snapshot time range");
    Ok(range)
}

/// Combines the ranges of all sources that have one.
///
/// Sources without a range are logged and skipped.
///
/// # Errors
///
/// Returns `StatsError::NoTimeRange` if no source has a range.
pub fn overall_time_range<'a, I>(sources: I) -> Result<TimeRange>
where
    I: IntoIterator<Item = &'a dyn StatsSource>,
{
    sources
        .into_iter()
        .filter_map(|source| {
            match source.time_range() {
                Ok(range) => Some(range),
                Err(e) => {
                    warn!(
                        source = source.short_name(),
                        error = %e,
                        "skipping source without time range"
                    );
                    None
                }
            }
        })
        .reduce(TimeRange::union)
        .ok_or_else(|| StatsError::no_time_range(".", "no source has a time range"))
}
