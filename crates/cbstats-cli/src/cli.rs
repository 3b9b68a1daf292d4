//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use cbstats_source::{ClusterConfig, ToolConfig};

use crate::error::CliError;

/// List the stats sources in a directory of Couchbase diagnostic bundles,
/// or the nodes of a running cluster, and optionally serve them.
#[derive(Parser, Debug, Clone)]
#[command(name = "cbstats")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "CBSTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding bundle archives or extracted bundles.
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Directory for query server logs.
    #[arg(short, long)]
    pub log_dir: Option<PathBuf>,

    /// Port of the first archived source.
    #[arg(short = 'p', long)]
    pub base_port: Option<u16>,

    /// Management URL of a running cluster node, e.g. `10.0.0.7:8091`.
    #[arg(long)]
    pub cluster: Option<String>,

    /// Cluster user.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Cluster password.
    #[arg(long, env = "CBSTATS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Start a query server for every archived source and wait for them.
    #[arg(long)]
    pub start: bool,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Builds the effective configuration.
    ///
    /// Starts from the config file, if any, then applies command-line
    /// overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is invalid, or if `--cluster` is
    /// given without a user from either the command line or the file.
    pub fn tool_config(&self) -> Result<ToolConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ToolConfig::from_file(path)?,
            None => ToolConfig::default(),
        };

        if let Some(dir) = &self.work_dir {
            config.work_dir.clone_from(dir);
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir.clone_from(dir);
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }

        if let Some(url) = &self.cluster {
            let cluster = match config.cluster.take() {
                Some(mut cluster) => {
                    cluster.url.clone_from(url);
                    cluster
                }
                None => {
                    let user = self.user.clone().ok_or_else(|| {
                        CliError::InvalidArgument("--cluster requires --user".to_string())
                    })?;
                    ClusterConfig::new(url, user, String::new())
                }
            };
            config.cluster = Some(cluster);
        }
        if let Some(cluster) = config.cluster.as_mut() {
            if let Some(user) = &self.user {
                cluster.user.clone_from(user);
            }
            if let Some(password) = &self.password {
                cluster.password.clone_from(password);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
