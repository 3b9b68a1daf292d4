//! Output formatting for the source report.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::DateTime;
use serde::Serialize;

use cbstats_source::{StatsSource, TimeRange};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone, Default)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// What is known about one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    /// Short display name.
    pub name: String,
    /// Stats endpoint URL.
    pub url: String,
    /// Whether the endpoint needs credentials.
    pub requires_auth: bool,
    /// Bucket names, sorted.
    pub buckets: Vec<String>,
    /// Covered time span, if known.
    pub time_range: Option<TimeRange>,
}

impl SourceSummary {
    /// Collects the summary of `source`.
    #[must_use]
    pub fn of(source: &dyn StatsSource) -> Self {
        Self {
            name: source.short_name().to_string(),
            url: source.stats_url(),
            requires_auth: source.requires_auth(),
            buckets: source.list_buckets().into_names(),
            time_range: source.time_range().ok(),
        }
    }
}

/// Every source plus the span they cover together.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    /// Sources in discovery order.
    pub sources: Vec<SourceSummary>,
    /// Union of the sources' time ranges.
    pub overall: Option<TimeRange>,
}

impl TableDisplay for SourceReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.sources.is_empty() {
            writeln!(writer, "No stats sources")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<32}  {:<36}  {:<41}  BUCKETS",
            "NAME", "URL", "TIME RANGE (UTC)"
        )?;
        writeln!(writer, "{}", "─".repeat(120))?;

        for source in &self.sources {
            let buckets = if source.buckets.is_empty() {
                "-".to_string()
            } else {
                source.buckets.join(",")
            };
            writeln!(
                writer,
                "{:<32}  {:<36}  {:<41}  {}",
                truncate(&source.name, 32),
                truncate(&source.url, 36),
                format_range(source.time_range.as_ref()),
                buckets
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} source(s)", self.sources.len())?;
        writeln!(writer, "Overall: {}", format_range(self.overall.as_ref()))?;
        Ok(())
    }
}

/// Renders a POSIX timestamp as UTC, falling back to the raw seconds.
fn format_timestamp(ts: f64) -> String {
    let secs = ts.floor() as i64;
    DateTime::from_timestamp(secs, 0)
        .map_or_else(|| format!("{ts:.3}"), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn format_range(range: Option<&TimeRange>) -> String {
    range.map_or_else(
        || "unknown".to_string(),
        |r| format!("{} .. {}", format_timestamp(r.min), format_timestamp(r.max)),
    )
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
