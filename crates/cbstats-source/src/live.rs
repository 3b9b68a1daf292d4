//! Stats sources for the nodes of a running cluster.
//!
//! Every node serves its own stats under `/_prometheus` on the management
//! port, so nothing needs starting. Topology and bucket lists come from the
//! management REST API.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::client::{ClusterClient, host_of, node_base_url, normalize_base_url};
use crate::error::Result;
use crate::source::StatsSource;
use crate::types::{BucketConfig, Credentials, TimeRange};

/// Topology endpoint.
pub const NODE_SERVICES_PATH: &str = "pools/default/nodeServices";

/// Bucket listing endpoint.
pub const BUCKETS_PATH: &str = "pools/default/buckets";

/// Path of the stats endpoint on every node.
pub const STATS_URL_PATH: &str = "_prometheus";

/// How far back a live node is assumed to have stats.
pub const LIVE_WINDOW_SECS: i64 = 60 * 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeServices {
    nodes_ext: Vec<NodeExt>,
}

#[derive(Debug, Deserialize)]
struct NodeExt {
    hostname: Option<String>,
    #[serde(default)]
    services: Services,
}

#[derive(Debug, Default, Deserialize)]
struct Services {
    mgmt: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct BucketInfo {
    name: String,
}

/// A running cluster node.
#[derive(Debug, Clone)]
pub struct LiveSource {
    host: String,
    port: u16,
    short_name: String,
    credentials: Credentials,
    client: ClusterClient,
}

impl LiveSource {
    /// Creates a source for the node at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = ClusterClient::new(Some(credentials.clone()), timeout)?;
        Ok(Self::with_client(host, port, credentials, client))
    }

    fn with_client(
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
        client: ClusterClient,
    ) -> Self {
        let host = host.into();
        Self {
            short_name: format!("{host}:{port}"),
            host,
            port,
            credentials,
            client,
        }
    }

    /// Asks the cluster at `cluster_url` for its nodes.
    ///
    /// A node without a `hostname` is the node that answered, so the host
    /// of `cluster_url` is used for it. Nodes without a management port are
    /// skipped. Any failure to reach the cluster is logged and yields no
    /// sources.
    #[must_use]
    pub fn discover(cluster_url: &str, credentials: &Credentials, timeout: Duration) -> Vec<Self> {
        let base_url = normalize_base_url(cluster_url);
        let client = match ClusterClient::new(Some(credentials.clone()), timeout) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "cannot create cluster client");
                return Vec::new();
            }
        };

        let services: NodeServices = match client.get_json(&base_url, NODE_SERVICES_PATH) {
            Ok(services) => services,
            Err(e) => {
                error!(cluster = %base_url, error = %e, "cannot access cluster");
                return Vec::new();
            }
        };

        let fallback_host = host_of(&base_url).unwrap_or_else(|| "127.0.0.1".to_string());
        let sources: Vec<Self> = services
            .nodes_ext
            .into_iter()
            .filter_map(|node| {
                let host = node.hostname.unwrap_or_else(|| fallback_host.clone());
                let Some(port) = node.services.mgmt else {
                    warn!(%host, "node has no management port, skipping");
                    return None;
                };
                debug!(%host, port, "live node");
                Some(Self::with_client(host, port, credentials.clone(), client.clone()))
            })
            .collect();

        info!(cluster = %base_url, count = sources.len(), "discovered live sources");
        sources
    }
}

impl StatsSource for LiveSource {
    fn short_name(&self) -> &str {
        &self.short_name
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn credentials(&self) -> Option<&Credentials> {
        Some(&self.credentials)
    }

    fn url_path(&self) -> &str {
        STATS_URL_PATH
    }

    fn list_buckets(&self) -> BucketConfig {
        let base_url = node_base_url(&self.host, self.port);
        match self.client.get_json::<Vec<BucketInfo>>(&base_url, BUCKETS_PATH) {
            Ok(buckets) => buckets.into_iter().map(|b| b.name).collect(),
            Err(e) => {
                error!(source = %self.short_name, error = %e, "cannot list buckets");
                BucketConfig::empty()
            }
        }
    }

    /// The last hour up to now.
    fn time_range(&self) -> Result<TimeRange> {
        Ok(TimeRange::last_seconds(LIVE_WINDOW_SECS))
    }
}
