//! Bucket extraction from a node's `couchbase.log` configuration dump.
//!
//! The dump has changed format across server versions without any version
//! marker, so three independent parsers are tried in priority order and the
//! first one that finds a non-empty bucket list wins:
//!
//! 1. [`parse_chronicle_dump`]: the `Chronicle dump` section (newest)
//! 2. [`parse_chronicle_config`]: the older `Chronicle config` section
//! 3. [`parse_ns_config`]: the legacy `Couchbase config` (ns_config) section
//!
//! Each parser returns `None` when its section or bucket list is absent.
//! A log matching none of them yields an empty [`BucketConfig`].

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::BucketConfig;

/// Name of the configuration dump file inside a bundle directory.
pub const CONFIG_LOG_FILE: &str = "couchbase.log";

const CHRONICLE_DUMP_MARKER: &str = "Chronicle dump";
const CHRONICLE_CONFIG_MARKER: &str = "Chronicle config";
const NS_CONFIG_MARKER: &str = "Couchbase config";

const CHRONICLE_CONFIG_BUCKETS_PREFIX: &str = " {bucket_names,";
const CHRONICLE_CONFIG_CLOSER: &str = "]},";
const NS_CONFIG_BUCKETS_MARKER: &str = " {buckets,";
const SECTION_DIVIDER: &str = "==================";

/// `{bucket_names,{[` opening the list in a Chronicle dump; group 1 is the rest of the line.
static CHRONICLE_BUCKET_NAMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\{bucket_names,\{\[(.*)$").unwrap_or_else(|_| unreachable!())
});

/// A top-level ns_config key, e.g. ` {cbas_memory_quota,`.
static NS_CONFIG_SIBLING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ \{.*,$").unwrap_or_else(|_| unreachable!()));

/// One bucket entry in the ns_config `configs` list, e.g. `    [{"default",`.
static NS_CONFIG_BUCKET_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^    [ \[]\{"(.*)",$"#).unwrap_or_else(|_| unreachable!()));

/// A bucket-list parser for one dump format.
type BucketParser = fn(&str) -> Option<Vec<String>>;

/// Parsers in priority order, newest format first.
const PARSERS: [(&str, BucketParser); 3] = [
    ("chronicle dump", parse_chronicle_dump),
    ("chronicle config", parse_chronicle_config),
    ("ns_config", parse_ns_config),
];

/// Reads `couchbase.log` from `bundle_dir` and extracts its buckets.
///
/// # Errors
///
/// Returns an error if the log file cannot be read. A log without any
/// recognized bucket section is not an error and yields an empty config.
pub fn parse_config_log(bundle_dir: &Path) -> Result<BucketConfig> {
    let path = bundle_dir.join(CONFIG_LOG_FILE);
    debug!(path = %path.display(), "parsing config log");
    let bytes = fs::read(&path)?;
    let config = parse_config_text(&String::from_utf8_lossy(&bytes));
    if config.is_empty() {
        warn!(path = %path.display(), "no bucket list found in config log");
    }
    Ok(config)
}

/// Runs the parsers in priority order, returning the first non-empty result.
#[must_use]
pub fn parse_config_text(text: &str) -> BucketConfig {
    PARSERS
        .iter()
        .find_map(|(format, parser)| {
            let buckets = parser(text).filter(|b| !b.is_empty())?;
            debug!(format = *format, count = buckets.len(), "found buckets");
            Some(buckets)
        })
        .map(BucketConfig::new)
        .unwrap_or_default()
}

/// Parses the `Chronicle dump` section.
///
/// The list opens with `{bucket_names,{[` and may span several lines until
/// the first `]`; anything after the bracket belongs to the enclosing term.
#[must_use]
pub fn parse_chronicle_dump(text: &str) -> Option<Vec<String>> {
    let lines = section_after(text, CHRONICLE_DUMP_MARKER)?;
    let mut list = String::new();
    let mut in_list = false;

    for line in lines {
        let fragment = if in_list {
            line
        } else {
            let Some(caps) = CHRONICLE_BUCKET_NAMES.captures(line) else {
                continue;
            };
            in_list = true;
            caps.get(1).map_or("", |m| m.as_str())
        };

        if let Some(end) = fragment.find(']') {
            list.push_str(&fragment[..end]);
            return Some(split_bucket_list(&list));
        }
        list.push_str(fragment);
    }
    None
}

/// Parses the older `Chronicle config` section.
///
/// The list opens on a line starting with ` {bucket_names,` and always ends
/// with `]},`. Nothing after the closer is consumed, even on the same line.
#[must_use]
pub fn parse_chronicle_config(text: &str) -> Option<Vec<String>> {
    let lines = section_after(text, CHRONICLE_CONFIG_MARKER)?;
    let mut list = String::new();
    let mut in_list = false;

    for line in lines {
        let fragment = if in_list {
            line
        } else {
            let Some(rest) = line.strip_prefix(CHRONICLE_CONFIG_BUCKETS_PREFIX) else {
                continue;
            };
            in_list = true;
            rest.strip_prefix('[').unwrap_or(rest)
        };

        if let Some(end) = fragment.find(CHRONICLE_CONFIG_CLOSER) {
            list.push_str(&fragment[..end]);
            return Some(split_bucket_list(&list));
        }
        list.push_str(fragment);
    }
    None
}

/// Parses the legacy `Couchbase config` section, one bucket per line.
///
/// Scanning stops at the second section divider after the header or at the
/// first top-level key following ` {buckets,`.
#[must_use]
pub fn parse_ns_config(text: &str) -> Option<Vec<String>> {
    let lines = section_after(text, NS_CONFIG_MARKER)?;
    let mut buckets = Vec::new();
    let mut in_buckets = false;
    let mut dividers = 0;

    for line in lines {
        if line.trim_start().starts_with(SECTION_DIVIDER) {
            dividers += 1;
            if dividers == 2 {
                break;
            }
        }

        if !in_buckets {
            in_buckets = line == NS_CONFIG_BUCKETS_MARKER;
        } else if NS_CONFIG_SIBLING.is_match(line) {
            break;
        } else if let Some(name) = NS_CONFIG_BUCKET_ENTRY
            .captures(line)
            .and_then(|caps| caps.get(1))
        {
            debug!(bucket = name.as_str(), "found ns_config bucket");
            buckets.push(name.as_str().to_string());
        }
    }

    in_buckets.then_some(buckets)
}

/// Returns the right-trimmed lines following the first line equal to `marker`.
fn section_after<'a>(
    text: &'a str,
    marker: &'static str,
) -> Option<impl Iterator<Item = &'a str>> {
    let mut lines = text.lines().map(str::trim_end);
    lines.by_ref().find(|line| *line == marker)?;
    Some(lines)
}

/// Splits a comma-separated list, trimming whitespace and quotes from each name.
fn split_bucket_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|token| token.trim().trim_matches('"').trim())
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}
