//! Locating diagnostic bundle directories and extracting them from zip archives.
//!
//! A bundle is a directory holding a `stats_snapshot/` subdirectory and a
//! `couchbase.log`. Bundles usually arrive as zip files in the working
//! directory. Only the parts needed here are extracted:
//!
//! - everything under `<bundle>/stats_snapshot/`, skipped entirely if that
//!   directory already exists on disk
//! - `<bundle>/couchbase.log`, skipped if already present
//!
//! The two existence checks are independent and are the only guard against
//! re-extraction, so running the locator repeatedly (or over archives with
//! overlapping bundles) never overwrites files.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::config_log::CONFIG_LOG_FILE;
use crate::error::{Result, StatsError};

/// Name of the metrics snapshot directory inside a bundle.
pub const SNAPSHOT_DIR_NAME: &str = "stats_snapshot";

/// File extension of bundle archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Returns the snapshot directory of a bundle.
#[must_use]
pub fn snapshot_dir(bundle_dir: &Path) -> PathBuf {
    bundle_dir.join(SNAPSHOT_DIR_NAME)
}

/// Returns true if `path` is a directory containing a snapshot directory.
#[must_use]
pub fn is_bundle_dir(path: &Path) -> bool {
    path.is_dir() && snapshot_dir(path).is_dir()
}

/// Counts of what an extraction pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Archives opened.
    pub archives: usize,
    /// Bundles found inside archives.
    pub bundles: usize,
    /// Snapshot files written.
    pub snapshot_files: usize,
    /// Bundles whose snapshot was already on disk.
    pub snapshots_skipped: usize,
    /// Config logs written.
    pub config_logs: usize,
}

impl ExtractionStats {
    fn merge(&mut self, other: Self) {
        self.archives += other.archives;
        self.bundles += other.bundles;
        self.snapshot_files += other.snapshot_files;
        self.snapshots_skipped += other.snapshots_skipped;
        self.config_logs += other.config_logs;
    }
}

/// Finds bundle directories in a working directory, extracting archives first.
#[derive(Debug, Clone)]
pub struct ArchiveLocator {
    work_dir: PathBuf,
}

impl ArchiveLocator {
    /// Creates a locator rooted at `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// The directory searched for archives and bundles.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Extracts every archive, then returns the bundle directories, sorted.
    ///
    /// If no bundle directory exists but the working directory itself holds
    /// a snapshot, the working directory is returned as the only bundle.
    /// Archives that cannot be read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::NoBundlesFound` if nothing was found, or an IO
    /// error if the working directory cannot be listed.
    pub fn locate(&self) -> Result<Vec<PathBuf>> {
        let stats = self.extract_all()?;
        debug!(?stats, "archive extraction finished");

        let mut dirs = self.bundle_dirs()?;
        if dirs.is_empty() && is_bundle_dir(&self.work_dir) {
            info!(dir = %self.work_dir.display(), "using working directory as the only bundle");
            dirs.push(self.work_dir.clone());
        }

        if dirs.is_empty() {
            warn!(
                dir = %self.work_dir.display(),
                "no *.{ARCHIVE_EXTENSION} archives, bundle directories \
                 or {SNAPSHOT_DIR_NAME} directory found"
            );
            return Err(StatsError::NoBundlesFound {
                dir: self.work_dir.clone(),
            });
        }
        Ok(dirs)
    }

    /// Lists the archives in the working directory, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be listed.
    pub fn archives(&self) -> Result<Vec<PathBuf>> {
        let mut archives: Vec<PathBuf> = fs::read_dir(&self.work_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
            })
            .collect();
        archives.sort();
        Ok(archives)
    }

    /// Lists the bundle directories in the working directory, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be listed.
    pub fn bundle_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.work_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_bundle_dir(path))
            .collect();
        dirs.sort();
        Ok(dirs)
    }

    /// Extracts the needed files from every archive in the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be listed.
    pub fn extract_all(&self) -> Result<ExtractionStats> {
        let mut stats = ExtractionStats::default();
        for archive in self.archives()? {
            match self.extract_archive(&archive) {
                Ok(s) => stats.merge(s),
                Err(e) => {
                    warn!(archive = %archive.display(), error = %e, "skipping unreadable archive");
                }
            }
        }
        Ok(stats)
    }

    /// Extracts the needed files from one archive.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read or a file cannot be written.
    pub fn extract_archive(&self, archive: &Path) -> Result<ExtractionStats> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(file).map_err(|e| StatsError::archive(archive, e))?;
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        let bundles: BTreeSet<&str> = names.iter().filter_map(|n| bundle_of_entry(n)).collect();

        let mut stats = ExtractionStats {
            archives: 1,
            bundles: bundles.len(),
            ..ExtractionStats::default()
        };
        let mut announced = false;

        for bundle in bundles {
            let bundle_dir = self.work_dir.join(bundle);
            let snapshot_exists = snapshot_dir(&bundle_dir).exists();
            debug!(bundle, snapshot_exists, "found bundle in archive");
            if snapshot_exists {
                stats.snapshots_skipped += 1;
            }

            let snapshot_prefix = format!("{bundle}/{SNAPSHOT_DIR_NAME}/");
            let log_entry = format!("{bundle}/{CONFIG_LOG_FILE}");

            for name in &names {
                let is_snapshot = name.starts_with(&snapshot_prefix);
                let should_extract = if is_snapshot {
                    !snapshot_exists
                } else if *name == log_entry {
                    !bundle_dir.join(CONFIG_LOG_FILE).exists()
                } else {
                    false
                };
                if !should_extract {
                    continue;
                }

                if !announced {
                    info!(
                        archive = %archive.display(),
                        "extracting stats and {CONFIG_LOG_FILE} from archive"
                    );
                    announced = true;
                }
                if self.extract_entry(&mut zip, archive, name)? {
                    if is_snapshot {
                        stats.snapshot_files += 1;
                    } else {
                        stats.config_logs += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Writes one archive entry below the working directory.
    ///
    /// Returns whether a file was written. Directory entries and entries
    /// with paths escaping the working directory write nothing.
    fn extract_entry<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        archive: &Path,
        name: &str,
    ) -> Result<bool> {
        let mut entry = zip.by_name(name).map_err(|e| StatsError::archive(archive, e))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = name, "skipping archive entry with unsafe path");
            return Ok(false);
        };
        let dest = self.work_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            return Ok(false);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!(entry = name, dest = %dest.display(), "extracting");
        let mut out = OpenOptions::new().write(true).create_new(true).open(&dest)?;
        io::copy(&mut entry, &mut out)?;
        Ok(true)
    }
}

/// Returns the bundle an archive entry belongs to, if it lies in a snapshot directory.
fn bundle_of_entry(name: &str) -> Option<&str> {
    let (top, rest) = name.split_once('/')?;
    let is_plain = !top.is_empty() && top != "." && top != "..";
    (is_plain && rest.starts_with(&format!("{SNAPSHOT_DIR_NAME}/"))).then_some(top)
}
