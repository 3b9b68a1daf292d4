//! The common interface of archived and live stats sources.

use std::fmt::Debug;
use std::path::Path;

use tracing::{info, warn};

use crate::client::node_base_url;
use crate::error::Result;
use crate::launcher::ServerProcess;
use crate::types::{BucketConfig, Credentials, TimeRange};

/// A place that serves time-series stats for one cluster node.
///
/// Implemented by [`ArchivedSource`](crate::ArchivedSource), which serves a
/// diagnostic bundle through a locally launched query server, and by
/// [`LiveSource`](crate::LiveSource), which points at a running node.
pub trait StatsSource: Send + Sync + Debug {
    /// Display name, unique within one discovery run.
    fn short_name(&self) -> &str;

    /// Port the stats endpoint listens on.
    fn port(&self) -> u16;

    /// Host the stats endpoint listens on.
    fn host(&self) -> &str;

    /// Whether requests to the endpoint need credentials.
    fn requires_auth(&self) -> bool {
        false
    }

    /// Credentials for the endpoint, if it requires any.
    fn credentials(&self) -> Option<&Credentials> {
        None
    }

    /// Path under the endpoint where stats are served.
    fn url_path(&self) -> &str {
        ""
    }

    /// Starts whatever serves this source, if it is not already running.
    ///
    /// Server output is logged under `log_dir`. Returns the started process,
    /// or `None` when nothing needed starting.
    ///
    /// # Errors
    ///
    /// Returns an error if a server had to be started and could not be.
    fn start_if_needed(&self, log_dir: &Path) -> Result<Option<ServerProcess>> {
        let _ = log_dir;
        Ok(None)
    }

    /// Bucket names known to this source, sorted.
    ///
    /// An empty result means either no buckets or that they could not be
    /// determined. Failures are logged, not returned.
    fn list_buckets(&self) -> BucketConfig;

    /// Time span covered by this source's stats.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NoTimeRange` if the span cannot be determined.
    fn time_range(&self) -> Result<TimeRange>;

    /// Base URL a query client uses for this source.
    fn stats_url(&self) -> String {
        format!(
            "{}/{}",
            node_base_url(self.host(), self.port()),
            self.url_path().trim_start_matches('/')
        )
    }
}

/// Starts every source in order, returning the processes that were started.
///
/// A source that fails to start is logged and skipped, so one missing
/// snapshot does not keep the others from being served.
///
/// # Errors
///
/// Returns an error only if `log_dir` cannot be created.
pub fn start_all<'a, I>(sources: I, log_dir: &Path) -> Result<Vec<ServerProcess>>
where
    I: IntoIterator<Item = &'a dyn StatsSource>,
{
    std::fs::create_dir_all(log_dir)?;

    let mut started = Vec::new();
    for source in sources {
        match source.start_if_needed(log_dir) {
            Ok(Some(process)) => {
                info!(
                    source = source.short_name(),
                    pid = process.id(),
                    url = %source.stats_url(),
                    "started stats server"
                );
                started.push(process);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(source = source.short_name(), error = %e, "failed to start stats server");
            }
        }
    }
    Ok(started)
}
