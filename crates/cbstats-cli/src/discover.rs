//! Source discovery and serving.
//!
//! Sources come from a live cluster when one is configured, otherwise from
//! the bundles in the working directory.

use std::io::Write;

use tracing::{info, warn};

use cbstats_source::{
    LiveSource, ServerProcess, StatsSource, ToolConfig, discover_archived_sources,
    overall_time_range, start_all,
};

use crate::error::CliError;
use crate::output::{OutputFormat, SourceReport, SourceSummary};

/// Discovers sources, reports them and optionally serves them.
#[derive(Debug, Clone)]
pub struct DiscoverCommand {
    config: ToolConfig,
}

impl DiscoverCommand {
    /// Create a new discover command.
    #[must_use]
    pub const fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Finds the configured sources.
    ///
    /// # Errors
    ///
    /// Returns an error if no bundles are found, or if the cluster reports
    /// no nodes.
    pub fn sources(&self) -> Result<Vec<Box<dyn StatsSource>>, CliError> {
        if let Some(cluster) = &self.config.cluster {
            let base_url = cluster.base_url();
            let sources: Vec<Box<dyn StatsSource>> =
                LiveSource::discover(&base_url, &cluster.credentials(), cluster.timeout())
                    .into_iter()
                    .map(|s| Box::new(s) as Box<dyn StatsSource>)
                    .collect();
            if sources.is_empty() {
                return Err(CliError::NoSources(format!("cluster {base_url} returned no nodes")));
            }
            return Ok(sources);
        }

        let sources = discover_archived_sources(
            &self.config.work_dir,
            self.config.base_port,
            &self.config.query_server,
        )?;
        Ok(sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn StatsSource>)
            .collect())
    }

    /// Summarizes `sources`.
    #[must_use]
    pub fn report(sources: &[Box<dyn StatsSource>]) -> SourceReport {
        let overall = match overall_time_range(sources.iter().map(AsRef::as_ref)) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!(error = %e, "overall time range unavailable");
                None
            }
        };
        SourceReport {
            sources: sources.iter().map(|s| SourceSummary::of(s.as_ref())).collect(),
            overall,
        }
    }

    /// Execute the discover command.
    ///
    /// With `start`, a query server is launched for every source that needs
    /// one and the command blocks until all of them exit.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery, output or launching fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        start: bool,
    ) -> Result<(), CliError> {
        let sources = self.sources()?;
        format.write(writer, &Self::report(&sources))?;
        writer.flush()?;

        if start {
            self.serve(&sources)?;
        }
        Ok(())
    }

    fn serve(&self, sources: &[Box<dyn StatsSource>]) -> Result<(), CliError> {
        let mut servers = start_all(sources.iter().map(AsRef::as_ref), &self.config.log_dir)?;
        if servers.is_empty() {
            info!("no query servers needed starting");
            return Ok(());
        }

        info!(
            count = servers.len(),
            log_dir = %self.config.log_dir.display(),
            "waiting for query servers"
        );
        for i in 0..servers.len() {
            let server = &mut servers[i];
            let status = match server.wait() {
                Ok(status) => status,
                Err(e) => {
                    shutdown(&mut servers[i..]);
                    return Err(e.into());
                }
            };
            if status.success() {
                info!(source = server.name(), "query server exited");
            } else {
                warn!(
                    source = server.name(),
                    %status,
                    log = %server.log_path().display(),
                    "query server failed"
                );
            }
        }
        Ok(())
    }
}

/// Kills `servers`, logging the ones that cannot be stopped.
fn shutdown(servers: &mut [ServerProcess]) {
    for server in servers {
        if let Err(e) = server.kill() {
            warn!(source = server.name(), error = %e, "failed to stop query server");
        }
    }
}
