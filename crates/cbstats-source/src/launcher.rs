//! Launching the external query server against a bundle's snapshot.
//!
//! The server is opaque here: it gets a config file, a storage path, a
//! retention and a listen address, and its output goes to a log file.
//! Launching is fire-and-forget. There is no readiness check and no restart.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StatsError};

/// Default query server binary.
pub const DEFAULT_BINARY: &str = "prometheus";

/// Default server config file (no scrape targets, serve stored data only).
pub const DEFAULT_CONFIG_FILE: &str = "noscrape.yml";

/// Retention long enough that snapshot data is never expired.
pub const DEFAULT_RETENTION: &str = "10y";

/// Default query lookback delta.
pub const DEFAULT_LOOKBACK_DELTA: &str = "600s";

/// How to run the query server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryServerConfig {
    /// Server executable, looked up on `PATH` if not a path.
    pub binary: PathBuf,
    /// Server configuration file.
    pub config_file: PathBuf,
    /// Storage retention, e.g. `10y`.
    pub retention: String,
    /// Query lookback delta, e.g. `600s`.
    pub lookback_delta: String,
    /// Extra arguments appended after the standard ones.
    pub extra_args: Vec<String>,
}

impl Default for QueryServerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            retention: DEFAULT_RETENTION.to_string(),
            lookback_delta: DEFAULT_LOOKBACK_DELTA.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl QueryServerConfig {
    /// Sets the server binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the server config file.
    #[must_use]
    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = config_file.into();
        self
    }

    /// Makes a relative config file path relative to `base`.
    pub fn resolve_config_file(&mut self, base: &Path) {
        if self.config_file.is_relative() {
            self.config_file = base.join(&self.config_file);
        }
    }

    /// Builds the argument list for serving `storage_path` on `port`.
    #[must_use]
    pub fn args(&self, storage_path: &Path, port: u16) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--config.file".into(),
            self.config_file.clone().into(),
            "--storage.tsdb.path".into(),
            storage_path.into(),
            "--storage.tsdb.no-lockfile".into(),
            "--storage.tsdb.retention.time".into(),
            self.retention.clone().into(),
            "--query.lookback-delta".into(),
            self.lookback_delta.clone().into(),
            "--web.listen-address".into(),
            listen_address(port).into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    /// Starts a server for `name` serving `storage_path` on `port`.
    ///
    /// Stdout and stderr both go to `log_path`, which is truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created or the process
    /// cannot be spawned.
    pub fn spawn(
        &self,
        name: &str,
        storage_path: &Path,
        port: u16,
        log_path: &Path,
    ) -> Result<ServerProcess> {
        if !self.config_file.is_file() {
            warn!(
                config_file = %self.config_file.display(),
                "query server config file not found"
            );
        }
        let stdout = File::create(log_path)?;
        let stderr = stdout.try_clone()?;

        info!(
            listen = %listen_address(port),
            storage = %storage_path.display(),
            log = %log_path.display(),
            "starting query server"
        );

        let child = Command::new(&self.binary)
            .args(self.args(storage_path, port))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| StatsError::Launch {
                program: self.binary.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(ServerProcess {
            name: name.to_string(),
            port,
            log_path: log_path.to_path_buf(),
            child,
        })
    }
}

/// The address a server for `port` listens on.
#[must_use]
pub fn listen_address(port: u16) -> String {
    format!("0.0.0.0:{port}")
}

/// The log file for the server of the source named `name`.
#[must_use]
pub fn server_log_path(log_dir: &Path, name: &str) -> PathBuf {
    let safe: String = name
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    log_dir.join(format!("prom-{safe}.log"))
}

/// A running query server.
#[derive(Debug)]
pub struct ServerProcess {
    name: String,
    port: u16,
    log_path: PathBuf,
    child: Child,
}

impl ServerProcess {
    /// Short name of the source this server serves.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port the server listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Log file receiving the server's output.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// OS process id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the server exits.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Kills the server and reaps it.
    ///
    /// A server that has already exited is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be signalled or reaped.
    pub fn kill(&mut self) -> Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.child.wait()?;
        Ok(())
    }
}
