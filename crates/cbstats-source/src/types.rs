//! Core types shared by every stats source.
//!
//! - [`BucketConfig`]: the sorted set of bucket names a source knows about
//! - [`TimeRange`]: a span of POSIX timestamps, in seconds
//! - [`Credentials`]: basic-auth user and password for live clusters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// The buckets associated with a stats source.
///
/// Names are kept sorted and de-duplicated. An empty config is a valid
/// result: it means either that the source has no buckets or that they
/// could not be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketConfig {
    names: Vec<String>,
}

impl BucketConfig {
    /// Creates a bucket config from names in any order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    /// Creates an empty bucket config.
    #[must_use]
    pub const fn empty() -> Self {
        Self { names: Vec::new() }
    }

    /// Returns the bucket names, sorted lexicographically.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no buckets are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true if the named bucket is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    /// Iterates over the bucket names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Consumes the config, returning the sorted names.
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

impl<S: Into<String>> FromIterator<S> for BucketConfig {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A span of POSIX timestamps in seconds, with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest timestamp, in seconds since the epoch.
    pub min: f64,
    /// Latest timestamp, in seconds since the epoch.
    pub max: f64,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::InvalidTimeRange` if `min > max` or either bound is NaN.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(StatsError::InvalidTimeRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Creates a range from millisecond timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::InvalidTimeRange` if `min_ms > max_ms`.
    pub fn from_millis(min_ms: i64, max_ms: i64) -> Result<Self> {
        Self::new(min_ms as f64 / 1000.0, max_ms as f64 / 1000.0)
    }

    /// The range covering the last `secs` seconds up to now.
    #[must_use]
    pub fn last_seconds(secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        Self {
            min: now - secs as f64,
            max: now,
        }
    }

    /// Returns the smallest range covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the length of the range in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.max - self.min
    }

    /// Returns true if `ts` lies within the range (inclusive).
    #[must_use]
    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.min && ts <= self.max
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}..{:.3}", self.min, self.max)
    }
}

/// Basic-auth credentials for a live cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// Creates a new user/password pair.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// The user to authenticate as.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The password to authenticate with.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
