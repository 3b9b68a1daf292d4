//! Blocking HTTP client for the cluster management REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::types::Credentials;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for JSON endpoints of the management API.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    http: reqwest::blocking::Client,
    credentials: Option<Credentials>,
}

impl ClusterClient {
    /// Creates a client sending `credentials` (if any) with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(credentials: Option<Credentials>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatsError::http("<client>", e))?;
        Ok(Self { http, credentials })
    }

    /// Fetches `path` relative to `base_url` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Http` on transport failures and non-success
    /// statuses, `StatsError::Json` if the body does not decode.
    pub fn get_json<T: DeserializeOwned>(&self, base_url: &str, path: &str) -> Result<T> {
        let url = join_url(base_url, path);
        debug!(url = %url, "GET");

        let mut request = self.http.get(&url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(creds.user(), Some(creds.password()));
        }

        let response = request.send().map_err(|e| StatsError::http(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::http(&url, format!("HTTP {status}")));
        }

        let body = response.text().map_err(|e| StatsError::http(&url, e))?;
        serde_json::from_str(&body).map_err(|e| StatsError::json(url, e))
    }
}

/// Normalizes a cluster address to a base URL without a trailing slash.
///
/// A bare `host` or `host:port` gets an `http://` scheme.
#[must_use]
pub fn normalize_base_url(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Base URL of the node at `host:port`.
#[must_use]
pub fn node_base_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// Extracts the host from a base URL.
#[must_use]
pub fn host_of(base_url: &str) -> Option<String> {
    reqwest::Url::parse(base_url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// One-shot HTTP server for exercising the client against canned responses.
#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serves a single request with `status` and `body`.
    ///
    /// Returns the base URL and a handle yielding the raw request text.
    pub(crate) fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    /// A base URL nothing is listening on.
    pub(crate) fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{addr}")
    }
}
