//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree within depth and file-count bounds and collecting [`FileRecord`]s
//! for duplicate detection.
//!
//! # Features
//!
//! - Sequential, name-sorted traversal for reproducible results
//! - Depth bound (root = depth 0) and file-count bound
//! - Case-insensitive name substring and extension filters
//! - Well-known cache/VCS directories always skipped
//! - Optional symlink following with loop detection
//! - Cooperative stop between entries via [`StopCondition`]
//!
//! Per-entry failures never abort the walk: the entry is skipped, logged,
//! and still counted as visited if it was listed.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default().with_name_filter(Some("invoice".into()));
//! let outcome = Walker::new(Path::new("/home/user/Documents"), config).walk();
//! println!("{} files out of {} entries", outcome.files.len(), outcome.entries_visited);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

use super::hardlink::FileIdentity;
use super::{FileRecord, ScanError, WalkerConfig, SKIPPED_DIRECTORIES};
use crate::progress::{phase, ProgressCallback};
use crate::signal::StopCondition;

/// Result of one traversal.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Collected files, in traversal order
    pub files: Vec<FileRecord>,
    /// Every entry listed below the root, including filtered and failed ones
    pub entries_visited: usize,
    /// Entries skipped because of an I/O failure
    pub errors: usize,
    /// Whether the file-count bound ended the walk
    pub limit_reached: bool,
    /// Whether the stop condition ended the walk
    pub interrupted: bool,
}

/// Directory walker for bounded file discovery.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    stop: Option<StopCondition>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("stop", &self.stop)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// Filters are normalized here, so a config built as a struct literal
    /// behaves like one built with the `with_*` methods.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config: config.normalized(),
            stop: None,
            progress_callback: None,
        }
    }

    /// Set the stop condition polled at every entry boundary.
    #[must_use]
    pub fn with_stop_condition(mut self, stop: StopCondition) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(StopCondition::should_stop)
    }

    /// Walk the directory tree and collect matching files.
    ///
    /// Never fails: unreadable entries are skipped and counted in
    /// [`WalkOutcome::errors`].
    pub fn walk(&self) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(phase::WALKING, 0);
        }

        log::info!(
            "Walking {} (max depth {}, max files {})",
            self.root.display(),
            self.config.max_depth,
            self.config.max_files
        );

        // walkdir counts the root's children as depth 1, so directories at
        // depth `max_depth` still get their entries listed.
        let mut entries = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.saturating_add(1))
            .sort_by_file_name()
            .into_iter();
        let mut last_dir: Option<PathBuf> = None;

        while let Some(entry_result) = entries.next() {
            if self.is_stop_requested() {
                log::info!("Walker: stop requested, returning partial file list");
                outcome.interrupted = true;
                break;
            }
            if outcome.files.len() >= self.config.max_files {
                log::info!("Walker: reached file limit of {}", self.config.max_files);
                outcome.limit_reached = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    if is_listed_entry(&e, last_dir.as_deref()) {
                        outcome.entries_visited += 1;
                    }
                    let err = self.convert_walkdir_error(e);
                    log::warn!("Skipping entry: {}", err);
                    outcome.errors += 1;
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            outcome.entries_visited += 1;

            let file_type = entry.file_type();
            if file_type.is_dir() {
                last_dir = Some(entry.path().to_path_buf());
                if is_skipped_directory(&entry) {
                    log::debug!("Skipping directory: {}", entry.path().display());
                    entries.skip_current_dir();
                }
                continue;
            }

            if file_type.is_symlink() {
                // Only reachable when links are not followed
                log::trace!("Skipping symlink: {}", entry.path().display());
                continue;
            }

            match self.process_entry(&entry) {
                Ok(Some(record)) => {
                    outcome.files.push(record);
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(
                            outcome.files.len(),
                            entry.path().to_string_lossy().as_ref(),
                        );
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("Skipping entry: {}", err);
                    outcome.errors += 1;
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(phase::WALKING);
        }

        log::info!(
            "Walk complete: {} files collected from {} entries ({} errors)",
            outcome.files.len(),
            outcome.entries_visited,
            outcome.errors
        );

        outcome
    }

    /// Apply filters to a non-directory entry and build its record.
    fn process_entry(&self, entry: &DirEntry) -> Result<Option<FileRecord>, ScanError> {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        if !self.passes_name_filter(&name) {
            log::trace!("Skipping file due to name filter: {}", path.display());
            return Ok(None);
        }
        if !self.passes_extension_filter(path) {
            log::trace!("Skipping file due to extension filter: {}", path.display());
            return Ok(None);
        }

        let metadata = entry
            .metadata()
            .map_err(|e| self.convert_walkdir_error(e))?;

        if !metadata.is_file() {
            return Ok(None);
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let record = FileRecord::new(path.to_path_buf(), metadata.len(), modified)
            .with_identity(FileIdentity::from_metadata(&metadata));

        Ok(Some(record))
    }

    fn passes_name_filter(&self, name: &str) -> bool {
        match self.config.name_filter {
            Some(ref needle) => name.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    fn passes_extension_filter(&self, path: &Path) -> bool {
        match self.config.extension_filter {
            Some(ref wanted) => path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .is_some_and(|e| e == *wanted),
            None => true,
        }
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn convert_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            return ScanError::Loop {
                path,
                ancestor: ancestor.to_path_buf(),
            };
        }

        match error.into_io_error() {
            Some(io) => match io.kind() {
                std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
                std::io::ErrorKind::NotFound => ScanError::NotFound(path),
                _ => ScanError::Io { path, source: io },
            },
            None => ScanError::Io {
                path,
                source: std::io::Error::other("unknown walk error"),
            },
        }
    }
}

/// Check whether a walk error belongs to an entry below the root that was
/// listed but could not be resolved (dangling link, link loop).
///
/// A failed `read_dir` is reported against the directory just yielded, which
/// was already counted.
fn is_listed_entry(error: &walkdir::Error, last_dir: Option<&Path>) -> bool {
    error.depth() > 0 && error.path().is_some_and(|path| Some(path) != last_dir)
}

/// Check whether a directory entry is one of the always-skipped names.
fn is_skipped_directory(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
}
