//! Tool configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file is valid. Command-line flags override individual fields afterwards.
//!
//! The query server needs a config file with no scrape targets, so that it
//! only serves the stored snapshot. The repository ships one as
//! `noscrape.yml`. A relative `query_server.config_file` is resolved against
//! the directory of the TOML file it was loaded from; without a TOML file the
//! default `noscrape.yml` is looked up in the current directory.
//!
//! ```toml
//! work_dir = "/data/support-case"
//! log_dir = "/data/support-case/logs"
//! base_port = 9090
//!
//! [query_server]
//! binary = "/opt/prometheus/prometheus"
//! config_file = "noscrape.yml"
//!
//! [cluster]
//! url = "10.0.0.7:8091"
//! user = "Administrator"
//! password = "password"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_TIMEOUT, normalize_base_url};
use crate::error::{Result, StatsError};
use crate::launcher::QueryServerConfig;
use crate::types::Credentials;

/// Default first port assigned to archived sources.
pub const DEFAULT_BASE_PORT: u16 = 9090;

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

const fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Connection settings for a live cluster.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Management URL of any cluster node, e.g. `http://10.0.0.7:8091`.
    /// A bare `host:port` is taken as `http://`.
    pub url: String,
    /// Basic-auth user.
    pub user: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClusterConfig {
    /// Creates cluster settings with the default timeout.
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// The cluster URL with a scheme and without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.url)
    }

    /// Credentials for the cluster.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.password)
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(StatsError::Config("cluster.url cannot be empty".to_string()));
        }

        let base_url = self.base_url();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StatsError::Config(
                "cluster.url must use http:// or https://".to_string(),
            ));
        }

        if self.user.is_empty() {
            return Err(StatsError::Config("cluster.user cannot be empty".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(StatsError::Config(
                "cluster.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Configuration for discovering and serving stats sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Directory holding bundle archives or extracted bundles.
    #[serde(default = "default_dir")]
    pub work_dir: PathBuf,
    /// Directory receiving query server logs.
    #[serde(default = "default_dir")]
    pub log_dir: PathBuf,
    /// Port of the first archived source; the rest follow in order.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Query server launch settings.
    #[serde(default)]
    pub query_server: QueryServerConfig,
    /// Live cluster settings. When set, sources come from the cluster
    /// instead of the working directory.
    #[serde(default)]
    pub cluster: Option<ClusterConfig>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            work_dir: default_dir(),
            log_dir: default_dir(),
            base_port: DEFAULT_BASE_PORT,
            query_server: QueryServerConfig::default(),
            cluster: None,
        }
    }
}

impl ToolConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StatsError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.as_ref().parent() {
            config.query_server.resolve_config_file(base);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StatsError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.base_port == 0 {
            return Err(StatsError::Config(
                "base_port must be greater than 0".to_string(),
            ));
        }

        if self.query_server.binary.as_os_str().is_empty() {
            return Err(StatsError::Config(
                "query_server.binary cannot be empty".to_string(),
            ));
        }

        if self.query_server.retention.is_empty() {
            return Err(StatsError::Config(
                "query_server.retention cannot be empty".to_string(),
            ));
        }

        if self.query_server.lookback_delta.is_empty() {
            return Err(StatsError::Config(
                "query_server.lookback_delta cannot be empty".to_string(),
            ));
        }

        if let Some(cluster) = &self.cluster {
            cluster.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ToolConfig::from_toml("").expect("empty config");
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.base_port, 9090);
        assert_eq!(config.work_dir, PathBuf::from("."));
        assert_eq!(config.query_server.retention, "10y");
        assert_eq!(config.query_server.lookback_delta, "600s");
        assert!(config.cluster.is_none());
    }

    #[test]
    fn full_config() {
        let toml = r#"
            work_dir = "/data/case"
            log_dir = "/data/case/logs"
            base_port = 19090

            [query_server]
            binary = "/opt/prometheus/prometheus"
            config_file = "/opt/promtimer/noscrape.yml"
            extra_args = ["--log.level=warn"]

            [cluster]
            url = "10.0.0.7:8091"
            user = "Administrator"
            password = "password"
            timeout_secs = 5
        "#;

        let config = ToolConfig::from_toml(toml).expect("full config");
        assert_eq!(config.work_dir, PathBuf::from("/data/case"));
        assert_eq!(config.log_dir, PathBuf::from("/data/case/logs"));
        assert_eq!(config.base_port, 19090);
        assert_eq!(config.query_server.binary, PathBuf::from("/opt/prometheus/prometheus"));
        assert_eq!(config.query_server.retention, "10y");
        assert_eq!(config.query_server.extra_args, ["--log.level=warn"]);

        let cluster = config.cluster.expect("cluster");
        assert_eq!(cluster.base_url(), "http://10.0.0.7:8091");
        assert_eq!(cluster.credentials().user(), "Administrator");
        assert_eq!(cluster.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn cluster_timeout_defaults() {
        let toml = r#"
            [cluster]
            url = "https://cb.example.com:18091"
            user = "admin"
        "#;
        let cluster = ToolConfig::from_toml(toml).expect("config").cluster.expect("cluster");
        assert_eq!(cluster.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(cluster.password, "");
    }

    #[test_case("base_port = 0" ; "zero base port")]
    #[test_case("[query_server]\nbinary = \"\"" ; "empty binary")]
    #[test_case("[query_server]\nretention = \"\"" ; "empty retention")]
    #[test_case("[query_server]\nlookback_delta = \"\"" ; "empty lookback")]
    #[test_case("[cluster]\nurl = \"\"\nuser = \"a\"" ; "empty cluster url")]
    #[test_case("[cluster]\nurl = \"ftp://h:21\"\nuser = \"a\"" ; "unsupported scheme")]
    #[test_case("[cluster]\nurl = \"h:8091\"\nuser = \"\"" ; "empty user")]
    #[test_case("[cluster]\nurl = \"h:8091\"\nuser = \"a\"\ntimeout_secs = 0" ; "zero timeout")]
    fn invalid_config(toml: &str) {
        let err = ToolConfig::from_toml(toml).expect_err("invalid config");
        assert!(matches!(err, StatsError::Config(_)));
    }

    #[test]
    fn invalid_toml() {
        let err = ToolConfig::from_toml("base_port = \"many\"").expect_err("bad type");
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn from_file_reads_toml() {
        let file = create_temp_config("base_port = 9200\n");
        let config = ToolConfig::from_file(file.path()).expect("config file");
        assert_eq!(config.base_port, 9200);
    }

    #[test]
    fn from_file_resolves_query_server_config_against_file_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cbstats.toml");
        std::fs::write(&path, "[query_server]\nbinary = \"prometheus\"\n").expect("write");

        let config = ToolConfig::from_file(&path).expect("config file");
        assert_eq!(config.query_server.config_file, dir.path().join("noscrape.yml"));
        assert_eq!(config.query_server.binary, PathBuf::from("prometheus"));
    }

    #[test]
    fn from_file_keeps_absolute_query_server_config() {
        let file =
            create_temp_config("[query_server]\nconfig_file = \"/etc/cbstats/noscrape.yml\"\n");
        let config = ToolConfig::from_file(file.path()).expect("config file");
        assert_eq!(
            config.query_server.config_file,
            PathBuf::from("/etc/cbstats/noscrape.yml")
        );
    }

    #[test]
    fn from_missing_file() {
        let err = ToolConfig::from_file("/nonexistent/cbstats.toml").expect_err("missing file");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn cluster_debug_redacts_password() {
        let cluster = ClusterConfig::new("h:8091", "admin", "hunter2");
        let debug = format!("{cluster:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
