//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Config dump layouts written into `couchbase.log`.
#[derive(Debug, Clone, Copy)]
pub enum ConfigDump {
    /// Current Chronicle dump.
    ChronicleDump,
    /// Older Chronicle config.
    ChronicleConfig,
    /// Legacy ns_config.
    NsConfig,
}

impl ConfigDump {
    /// Renders a log naming `buckets` in this layout.
    pub fn render(self, buckets: &[&str]) -> String {
        let divider = "=".repeat(78);
        let quoted: Vec<String> = buckets.iter().map(|b| format!("\"{b}\"")).collect();
        match self {
            Self::ChronicleDump => format!(
                "{divider}\nChronicle dump\n{divider}\n\
                 [{{'$chronicle_metadata',{{...}}}},\n \
                 {{bucket_names,{{[{}],\n                {{<<\"0a2bd1c5\">>,31}}}}}},\n",
                quoted.join(",")
            ),
            Self::ChronicleConfig => format!(
                "{divider}\nChronicle config\n{divider}\n \
                 {{bucket_names,[{}]}},\n {{cluster_compat_version,[7,0]}},\n",
                quoted.join(",")
            ),
            Self::NsConfig => {
                let mut out =
                    format!("{divider}\nCouchbase config\n{divider}\n {{buckets,\n   {{configs,\n");
                for (i, bucket) in buckets.iter().enumerate() {
                    let open = if i == 0 { '[' } else { ' ' };
                    out.push_str(&format!(
                        "    {open}{{\"{bucket}\",\n      [{{repl_type,dcp}}]}},\n"
                    ));
                }
                out.push_str(" {cbas_memory_quota,1024},\n");
                out.push_str(&format!("{divider}\n"));
                out
            }
        }
    }
}

/// One bundle inside an archive.
#[derive(Debug, Clone)]
pub struct BundleFixture {
    /// Top-level directory name.
    pub name: String,
    /// Content of `couchbase.log`.
    pub config_log: String,
    /// `(minTime, maxTime)` in milliseconds, one per shard.
    pub shards: Vec<(i64, i64)>,
}

impl BundleFixture {
    /// A bundle with one shard and a config log naming `buckets`.
    pub fn new(name: &str, dump: ConfigDump, buckets: &[&str], min_ms: i64, max_ms: i64) -> Self {
        Self {
            name: name.to_string(),
            config_log: dump.render(buckets),
            shards: vec![(min_ms, max_ms)],
        }
    }

    /// Adds a shard.
    pub fn with_shard(mut self, min_ms: i64, max_ms: i64) -> Self {
        self.shards.push((min_ms, max_ms));
        self
    }
}

fn stored() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// Writes a zip archive holding `bundles`, as a diagnostic collection would.
pub fn write_archive(path: &Path, bundles: &[BundleFixture]) {
    let file = File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    for bundle in bundles {
        let name = &bundle.name;
        zip.add_directory(format!("{name}/"), stored()).expect("add bundle dir");

        zip.start_file(format!("{name}/couchbase.log"), stored()).expect("start log");
        zip.write_all(bundle.config_log.as_bytes()).expect("write log");

        zip.start_file(format!("{name}/ns_server.babysitter.log"), stored())
            .expect("start noise");
        zip.write_all(b"not extracted").expect("write noise");

        for (i, (min_ms, max_ms)) in bundle.shards.iter().enumerate() {
            let shard = format!("{name}/stats_snapshot/01SHARD{i}");
            zip.start_file(format!("{shard}/meta.json"), stored()).expect("start meta");
            write!(
                zip,
                r#"{{"ulid":"01SHARD{i}","minTime":{min_ms},"maxTime":{max_ms},"version":1}}"#
            )
            .expect("write meta");
            zip.start_file(format!("{shard}/chunks/000001"), stored()).expect("start chunk");
            zip.write_all(&[0u8; 64]).expect("write chunk");
        }
    }
    zip.finish().expect("finish archive");
}

/// A canned HTTP response.
pub struct Route {
    /// Status line, e.g. `200 OK`.
    pub status: &'static str,
    /// Response body.
    pub body: String,
}

/// A fake management API answering a fixed number of requests.
pub struct FakeCluster {
    /// Port the fake listens on.
    pub port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl FakeCluster {
    /// Serves `requests` requests, answering by path from `routes` and with
    /// 404 otherwise.
    pub fn serve(routes: HashMap<&'static str, Route>, requests: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.expect("accept");
                let request = read_request(&mut stream);
                let request_line = request.lines().next().unwrap_or_default().to_string();
                let path = request_line.split_whitespace().nth(1).unwrap_or_default();

                let (status, body) = routes
                    .get(path)
                    .map_or(("404 Not Found", ""), |r| (r.status, r.body.as_str()));
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).expect("write response");
                seen.push(request);
            }
            seen
        });
        Self { port, handle }
    }

    /// Base URL of the fake.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Waits for the fake to finish, returning the raw requests it received.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().expect("fake cluster thread")
    }
}

fn read_request(stream: &mut impl Read) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).expect("read request");
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&request).into_owned()
}
