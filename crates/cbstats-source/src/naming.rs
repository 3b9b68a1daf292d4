//! Short, unique display names for bundle directories.
//!
//! Bundle directories follow `<prefix>_ns_<node>@<host>_<start>-<end>`.
//! Bundles from one cluster share the host fragment and re-collections of
//! one node share the node id, so names are rendered with increasingly
//! verbose [`NameFormat`]s until every name in the set is unique.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// `<prefix>_ns_<node>@<host>_<start>-<end>`.
static BUNDLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.+?_ns_(\d+)@(.+)_(\d+)-(\d+)$").unwrap_or_else(|_| unreachable!())
});

/// Components captured from a conventionally named bundle directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    /// Numeric node id.
    pub node_id: String,
    /// Host name or address fragment.
    pub host: String,
    /// First collection timestamp field.
    pub start: String,
    /// Second collection timestamp field.
    pub end: String,
}

/// A raw directory name and its parsed components, if it follows the convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNameCandidate {
    raw: String,
    parts: Option<NameParts>,
}

impl DirectoryNameCandidate {
    /// Parses a directory name.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parts = BUNDLE_NAME.captures(&raw).and_then(|caps| {
            Some(NameParts {
                node_id: caps.get(1)?.as_str().to_string(),
                host: caps.get(2)?.as_str().to_string(),
                start: caps.get(3)?.as_str().to_string(),
                end: caps.get(4)?.as_str().to_string(),
            })
        });
        Self { raw, parts }
    }

    /// The directory name as found on disk.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The captured components, if the name follows the convention.
    #[must_use]
    pub fn parts(&self) -> Option<&NameParts> {
        self.parts.as_ref()
    }

    /// Renders the name in `format`, or returns the raw name if it has no parts.
    #[must_use]
    pub fn render(&self, format: NameFormat) -> String {
        self.parts
            .as_ref()
            .map_or_else(|| self.raw.clone(), |parts| format.render(parts))
    }
}

/// Display formats, from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFormat {
    /// `<host>`
    Host,
    /// `node-<node>@<host>`
    NodeAtHost,
    /// `<host>-<start>-<end>`
    HostWithTimes,
    /// `node-<node>@<host>-<start>-<end>`
    Full,
}

impl NameFormat {
    /// All formats in the order they are tried.
    pub const ALL: [Self; 4] = [Self::Host, Self::NodeAtHost, Self::HostWithTimes, Self::Full];

    /// Renders `parts` in this format.
    #[must_use]
    pub fn render(self, parts: &NameParts) -> String {
        let NameParts {
            node_id,
            host,
            start,
            end,
        } = parts;
        match self {
            Self::Host => host.clone(),
            Self::NodeAtHost => format!("node-{node_id}@{host}"),
            Self::HostWithTimes => format!("{host}-{start}-{end}"),
            Self::Full => format!("node-{node_id}@{host}-{start}-{end}"),
        }
    }
}

/// Renders every candidate in `format`, returning `None` on any collision.
fn try_format(candidates: &[DirectoryNameCandidate], format: NameFormat) -> Option<Vec<String>> {
    let names: Vec<String> = candidates.iter().map(|c| c.render(format)).collect();
    let mut seen = HashSet::with_capacity(names.len());
    names.iter().all(|name| seen.insert(name.as_str())).then_some(names)
}

/// Assigns a short display name to each directory name.
///
/// The result has the same length and order as the input. Returns the
/// shortest format under which all names are unique, or the raw names if
/// every format collides. If the input has no duplicates, neither does the
/// output.
#[must_use]
pub fn assign_names<S: AsRef<str>>(dir_names: &[S]) -> Vec<String> {
    let candidates: Vec<DirectoryNameCandidate> = dir_names
        .iter()
        .map(|name| DirectoryNameCandidate::parse(name.as_ref()))
        .collect();

    for format in NameFormat::ALL {
        if let Some(names) = try_format(&candidates, format) {
            debug!(?format, count = names.len(), "assigned source names");
            return names;
        }
    }

    debug!("no name format is unique, using directory names");
    candidates.into_iter().map(|c| c.raw).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parse_conventional_name() {
        let candidate =
            DirectoryNameCandidate::parse("cbcollect_info_ns_1@10.0.0.5_20210301-101500");
        let parts = candidate.parts().expect("parts");
        assert_eq!(parts.node_id, "1");
        assert_eq!(parts.host, "10.0.0.5");
        assert_eq!(parts.start, "20210301");
        assert_eq!(parts.end, "101500");
    }

    #[test_case("stats_snapshot" ; "no convention")]
    #[test_case("." ; "current directory")]
    #[test_case("cb_ns_x@host_1-2" ; "non numeric node")]
    #[test_case("cb_ns_1@host_1" ; "missing end stamp")]
    fn parse_unconventional_name(raw: &str) {
        let candidate = DirectoryNameCandidate::parse(raw);
        assert!(candidate.parts().is_none());
        assert_eq!(candidate.render(NameFormat::Host), raw);
    }

    #[test]
    fn render_each_format() {
        let candidate = DirectoryNameCandidate::parse("cb_ns_3@nodeA_100-200");
        assert_eq!(candidate.render(NameFormat::Host), "nodeA");
        assert_eq!(candidate.render(NameFormat::NodeAtHost), "node-3@nodeA");
        assert_eq!(candidate.render(NameFormat::HostWithTimes), "nodeA-100-200");
        assert_eq!(candidate.render(NameFormat::Full), "node-3@nodeA-100-200");
    }

    #[test]
    fn single_name_uses_host() {
        assert_eq!(assign_names(&["cb_ns_1@nodeA_100-200"]), ["nodeA"]);
    }

    #[test]
    fn distinct_hosts_use_host() {
        let names = assign_names(&["cb_ns_1@nodeA_100-200", "cb_ns_1@nodeB_100-200"]);
        assert_eq!(names, ["nodeA", "nodeB"]);
    }

    #[test]
    fn shared_host_uses_node_id() {
        let names = assign_names(&["cb_ns_1@nodeA_100-200", "cb_ns_2@nodeA_100-200"]);
        assert_eq!(names, ["node-1@nodeA", "node-2@nodeA"]);
    }

    #[test]
    fn shared_node_and_host_use_times() {
        let names = assign_names(&["cb_ns_1@nodeA_100-200", "cb_ns_1@nodeA_300-400"]);
        assert_eq!(names, ["nodeA-100-200", "nodeA-300-400"]);
    }

    #[test]
    fn only_node_id_differs_with_shared_times_uses_full() {
        let names = assign_names(&[
            "cb_ns_1@nodeA_100-200",
            "cb_ns_2@nodeA_100-200",
            "cb_ns_1@nodeA_300-400",
        ]);
        assert_eq!(
            names,
            [
                "node-1@nodeA-100-200",
                "node-2@nodeA-100-200",
                "node-1@nodeA-300-400"
            ]
        );
    }

    #[test]
    fn prefixes_only_differ_falls_back_to_raw() {
        let dirs = ["a_ns_1@nodeA_100-200", "b_ns_1@nodeA_100-200"];
        assert_eq!(assign_names(&dirs), dirs);
    }

    #[test]
    fn unmatched_names_pass_through() {
        let dirs = ["alpha", "beta", "cb_ns_1@nodeA_100-200"];
        assert_eq!(assign_names(&dirs), ["alpha", "beta", "nodeA"]);
    }

    #[test]
    fn rendered_name_colliding_with_raw_name_escalates() {
        let names = assign_names(&["nodeA", "cb_ns_1@nodeA_100-200"]);
        assert_eq!(names, ["nodeA", "node-1@nodeA"]);
    }

    #[test]
    fn idempotent_on_own_output() {
        let first = assign_names(&["cb_ns_1@nodeA_100-200", "cb_ns_2@nodeA_100-200"]);
        let second = assign_names(&first);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input() {
        let names: Vec<String> = assign_names::<&str>(&[]);
        assert!(names.is_empty());
    }
}
