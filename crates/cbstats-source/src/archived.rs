//! Stats sources backed by extracted diagnostic bundles.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveLocator, snapshot_dir};
use crate::config_log::parse_config_log;
use crate::error::{Result, StatsError};
use crate::launcher::{QueryServerConfig, ServerProcess, server_log_path};
use crate::naming::assign_names;
use crate::source::StatsSource;
use crate::time_range::snapshot_time_range;
use crate::types::{BucketConfig, TimeRange};

/// Host a locally launched query server is reached on.
pub const LOCAL_HOST: &str = "127.0.0.1";

/// A bundle directory served by a query server on a local port.
#[derive(Debug)]
pub struct ArchivedSource {
    dir: PathBuf,
    short_name: String,
    port: u16,
    server: QueryServerConfig,
    buckets: OnceCell<BucketConfig>,
}

impl ArchivedSource {
    /// Creates a source for the bundle at `dir`.
    #[must_use]
    pub fn new(
        dir: impl Into<PathBuf>,
        short_name: impl Into<String>,
        port: u16,
        server: QueryServerConfig,
    ) -> Self {
        Self {
            dir: dir.into(),
            short_name: short_name.into(),
            port,
            server,
            buckets: OnceCell::new(),
        }
    }

    /// The bundle directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The snapshot directory the query server serves.
    #[must_use]
    pub fn snapshot_dir(&self) -> PathBuf {
        snapshot_dir(&self.dir)
    }
}

impl StatsSource for ArchivedSource {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn host(&self) -> &str {
        LOCAL_HOST
    }

    fn start_if_needed(&self, log_dir: &Path) -> Result<Option<ServerProcess>> {
        let log_path = server_log_path(log_dir, &self.short_name);
        self.server
            .spawn(&self.short_name, &self.snapshot_dir(), self.port, &log_path)
            .map(Some)
    }

    /// Parses the bundle's config log on first use and caches the result.
    ///
    /// A log that cannot be read is reported and not cached, so a later
    /// call can retry.
    fn list_buckets(&self) -> BucketConfig {
        match self.buckets.get_or_try_init(|| parse_config_log(&self.dir)) {
            Ok(buckets) => buckets.clone(),
            Err(e) => {
                warn!(source = %self.short_name, error = %e, "could not read bucket config");
                BucketConfig::empty()
            }
        }
    }

    fn time_range(&self) -> Result<TimeRange> {
        snapshot_time_range(&self.dir)
    }
}

/// Display name input for a bundle directory.
///
/// The working directory itself may be the bundle, in which case its
/// canonical name is used, or `.` if it has none.
fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(ToOwned::to_owned)
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(ToOwned::to_owned))
        })
        .map_or_else(|| ".".to_string(), |name| name.to_string_lossy().into_owned())
}

/// Port of the source at `index`.
///
/// # Errors
///
/// Returns `StatsError::PortOverflow` if the port would exceed `u16::MAX`.
pub fn source_port(base_port: u16, index: usize) -> Result<u16> {
    u16::try_from(index)
        .ok()
        .and_then(|i| base_port.checked_add(i))
        .ok_or(StatsError::PortOverflow {
            base: base_port,
            index,
        })
}

/// Finds every bundle under `work_dir` and wraps each in an [`ArchivedSource`].
///
/// Sources are ordered by directory path, named with
/// [`assign_names`] and numbered from `base_port` upwards.
///
/// # Errors
///
/// Returns `StatsError::NoBundlesFound` if the working directory holds no
/// bundles, or `StatsError::PortOverflow` if there are too many for the
/// base port.
pub fn discover_archived_sources(
    work_dir: &Path,
    base_port: u16,
    server: &QueryServerConfig,
) -> Result<Vec<ArchivedSource>> {
    let dirs = ArchiveLocator::new(work_dir).locate()?;
    let labels: Vec<String> = dirs.iter().map(|d| dir_label(d)).collect();
    let names = assign_names(&labels);

    let sources = dirs
        .into_iter()
        .zip(names)
        .enumerate()
        .map(|(index, (dir, name))| {
            let port = source_port(base_port, index)?;
            debug!(source = %name, port, dir = %dir.display(), "archived source");
            Ok(ArchivedSource::new(dir, name, port, server.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(count = sources.len(), dir = %work_dir.display(), "discovered archived sources");
    Ok(sources)
}
