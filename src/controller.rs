//! Scan controller: one bounded, cancellable scan from request to result.
//!
//! # Overview
//!
//! [`ScanController::scan`] validates a [`ScanRequest`], starts the scan's
//! single wall-clock deadline, runs the [`Walker`], then the
//! [`DuplicateFinder`], and assembles a [`ScanResult`] with statistics.
//!
//! ```text
//! Idle → Walking → Grouping → Done
//!           │          │
//!           └──────────┴──→ Cancelled → Done
//! ```
//!
//! Only a malformed request fails. A deadline or cancellation produces a
//! successful result with `timed_out` set and whatever groups were fully
//! resolved; per-file I/O failures are absorbed along the way.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::controller::{scan, ScanRequest};
//! use dupescan::signal::CancelHandle;
//! use std::time::Duration;
//!
//! let request = ScanRequest::new("/data/photos")
//!     .with_extension_filter(Some("jpg".to_string()))
//!     .with_timeout(Duration::from_secs(30));
//!
//! let result = scan(&request, &CancelHandle::new()).expect("valid request");
//! println!("{} groups in {} ms", result.stats.groups, result.stats.elapsed_ms);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::{
    DuplicateFinder, DuplicateGroup, FinderConfig, DEFAULT_CONTENT_PEEK_SIZE,
    DEFAULT_FUZZY_MAX_CANDIDATES, DEFAULT_FUZZY_THRESHOLD, DEFAULT_IO_THREADS,
    DEFAULT_MAX_HASH_SIZE,
};
use crate::progress::ProgressCallback;
use crate::scanner::{Walker, WalkerConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILES, PREHASH_SIZE};
use crate::signal::{CancelHandle, StopCondition, StopReason};

/// Default overall scan timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// A request that cannot be scanned. The only failure a scan returns.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No root path was given.
    #[error("Scan root is empty")]
    EmptyRoot,

    /// The root does not exist.
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    /// The root exists but is not a directory.
    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// `max_files` is zero, so nothing could ever be collected.
    #[error("Maximum file count must be at least 1")]
    ZeroMaxFiles,

    /// The root could not be resolved to an absolute path.
    #[error("Cannot resolve scan root {path}: {source}")]
    Canonicalize {
        /// The requested root
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Input for one scan. Immutable once the scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Directory to scan
    pub root: PathBuf,
    /// Deepest directory level listed (root = 0)
    pub max_depth: usize,
    /// Stop walking once this many files are collected
    pub max_files: usize,
    /// Case-insensitive substring of the base name
    pub name_filter: Option<String>,
    /// Case-insensitive extension, with or without the leading dot
    pub extension_filter: Option<String>,
    /// Snippet an exact group must contain near the start of a member
    pub content_filter: Option<String>,
    /// Overall wall-clock budget
    pub timeout: Duration,
}

impl ScanRequest {
    /// Create a request with default bounds and no filters.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            name_filter: None,
            extension_filter: None,
            content_filter: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the maximum traversal depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum number of collected files.
    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Set the name substring filter.
    #[must_use]
    pub fn with_name_filter(mut self, filter: Option<String>) -> Self {
        self.name_filter = filter;
        self
    }

    /// Set the extension filter.
    #[must_use]
    pub fn with_extension_filter(mut self, filter: Option<String>) -> Self {
        self.extension_filter = filter;
        self
    }

    /// Set the content-snippet filter.
    #[must_use]
    pub fn with_content_filter(mut self, filter: Option<String>) -> Self {
        self.content_filter = filter;
        self
    }

    /// Set the overall timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the request and resolve the root to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] for an empty, missing or non-directory root,
    /// or a zero file bound.
    pub fn validate(&self) -> Result<PathBuf, RequestError> {
        if self.root.as_os_str().is_empty() {
            return Err(RequestError::EmptyRoot);
        }
        if self.max_files == 0 {
            return Err(RequestError::ZeroMaxFiles);
        }
        if !self.root.exists() {
            return Err(RequestError::RootNotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(RequestError::NotADirectory(self.root.clone()));
        }
        self.root
            .canonicalize()
            .map_err(|source| RequestError::Canonicalize {
                path: self.root.clone(),
                source,
            })
    }

    fn walker_config(&self, follow_symlinks: bool) -> WalkerConfig {
        WalkerConfig::default()
            .with_max_depth(self.max_depth)
            .with_max_files(self.max_files)
            .with_name_filter(self.name_filter.clone())
            .with_extension_filter(self.extension_filter.clone())
            .with_follow_symlinks(follow_symlinks)
    }
}

/// Engine tunables shared by every scan a controller runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Concurrent hashing tasks
    pub io_threads: usize,
    /// Stage 2 window in bytes
    pub prehash_size: usize,
    /// Largest hashable file
    pub max_hash_size: u64,
    /// Window searched by the content filter
    pub content_peek_size: usize,
    /// Largest fuzzy name distance
    pub fuzzy_threshold: usize,
    /// Cap on fuzzy candidates
    pub fuzzy_max_candidates: usize,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            prehash_size: PREHASH_SIZE,
            max_hash_size: DEFAULT_MAX_HASH_SIZE,
            content_peek_size: DEFAULT_CONTENT_PEEK_SIZE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_max_candidates: DEFAULT_FUZZY_MAX_CANDIDATES,
            follow_symlinks: false,
        }
    }
}

/// Statistics reported with every result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Directory entries listed by the walker, excluding the root
    pub scanned: usize,
    /// Distinct files placed in any group
    pub matched: usize,
    /// Number of groups
    pub groups: usize,
    /// Sum over groups of (members - 1)
    pub total_duplicates: usize,
    /// Wall-clock time of the scan
    pub elapsed_ms: u64,
    /// Whether a deadline or cancellation cut the scan short
    pub timed_out: bool,
}

impl ScanStats {
    /// Compute the group-derived counters.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup], scanned: usize) -> Self {
        let distinct: HashSet<&Path> = groups
            .iter()
            .flat_map(|g| g.files.iter().map(|f| f.path.as_path()))
            .collect();
        Self {
            scanned,
            matched: distinct.len(),
            groups: groups.len(),
            total_duplicates: groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            ..Default::default()
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Duplicate groups: exact, then metadata, then fuzzy pairs
    pub groups: Vec<DuplicateGroup>,
    /// Summary statistics
    pub stats: ScanStats,
    /// What stopped the scan early, if anything
    #[serde(skip)]
    pub stop_reason: Option<StopReason>,
    /// Entries the walker could not list or stat
    #[serde(skip)]
    pub walk_errors: usize,
    /// Whether the file bound ended the walk
    #[serde(skip)]
    pub limit_reached: bool,
}

impl ScanResult {
    /// Check whether any group was found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Not started
    Idle,
    /// Directory traversal running
    Walking,
    /// Grouping engine running
    Grouping,
    /// Stopped by deadline or cancellation, result being assembled
    Cancelled,
    /// Result assembled
    Done,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Walking => "walking",
            ScanPhase::Grouping => "grouping",
            ScanPhase::Cancelled => "cancelled",
            ScanPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives the walker and the grouping engine for one scan at a time.
pub struct ScanController {
    settings: ScanSettings,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    phase: ScanPhase,
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("settings", &self.settings)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("phase", &self.phase)
            .finish()
    }
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new(ScanSettings::default())
    }
}

impl ScanController {
    /// Create a controller with the given engine settings.
    #[must_use]
    pub fn new(settings: ScanSettings) -> Self {
        Self {
            settings,
            progress_callback: None,
            phase: ScanPhase::Idle,
        }
    }

    /// Report walking and grouping phases to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run one scan.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] before any traversal if the request is
    /// malformed. Every other condition yields `Ok`.
    pub fn scan(
        &mut self,
        request: &ScanRequest,
        cancel: &CancelHandle,
    ) -> Result<ScanResult, RequestError> {
        self.phase = ScanPhase::Idle;
        let root = request.validate()?;

        let started = Instant::now();
        let stop = StopCondition::new(cancel).with_deadline(started.checked_add(request.timeout));

        log::info!(
            "Scanning {} (depth {}, up to {} files, timeout {} ms)",
            root.display(),
            request.max_depth,
            request.max_files,
            request.timeout.as_millis()
        );

        self.transition(ScanPhase::Walking);
        let mut walker = Walker::new(&root, request.walker_config(self.settings.follow_symlinks))
            .with_stop_condition(stop.clone());
        if let Some(ref callback) = self.progress_callback {
            walker = walker.with_progress_callback(Arc::clone(callback));
        }
        let outcome = walker.walk();

        let mut interrupted = outcome.interrupted;
        let groups = if interrupted {
            Vec::new()
        } else {
            self.transition(ScanPhase::Grouping);
            let finder = DuplicateFinder::new(self.finder_config(request));
            let (groups, finder_stats) = finder.find_groups(outcome.files, &stop);
            interrupted = finder_stats.interrupted;
            groups
        };

        let stop_reason = if interrupted {
            self.transition(ScanPhase::Cancelled);
            Some(stop.reason().unwrap_or(StopReason::DeadlineExceeded))
        } else {
            None
        };

        let mut stats = ScanStats::from_groups(&groups, outcome.entries_visited);
        stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        stats.timed_out = interrupted;
        self.transition(ScanPhase::Done);

        match stop_reason {
            Some(reason) => log::warn!(
                "Scan stopped early ({}): {} groups after {} ms",
                reason,
                stats.groups,
                stats.elapsed_ms
            ),
            None => log::info!(
                "Scan complete: {} entries, {} groups, {} duplicates in {} ms",
                stats.scanned,
                stats.groups,
                stats.total_duplicates,
                stats.elapsed_ms
            ),
        }

        Ok(ScanResult {
            groups,
            stats,
            stop_reason,
            walk_errors: outcome.errors,
            limit_reached: outcome.limit_reached,
        })
    }

    fn finder_config(&self, request: &ScanRequest) -> FinderConfig {
        let mut config = FinderConfig::default()
            .with_io_threads(self.settings.io_threads)
            .with_prehash_size(self.settings.prehash_size)
            .with_max_hash_size(self.settings.max_hash_size)
            .with_content_filter(request.content_filter.clone())
            .with_content_peek_size(self.settings.content_peek_size)
            .with_fuzzy_threshold(self.settings.fuzzy_threshold)
            .with_fuzzy_max_candidates(self.settings.fuzzy_max_candidates);
        if let Some(ref callback) = self.progress_callback {
            config = config.with_progress_callback(Arc::clone(callback));
        }
        config
    }

    fn transition(&mut self, next: ScanPhase) {
        log::debug!("Scan phase: {} → {}", self.phase, next);
        self.phase = next;
    }
}

/// Run one scan with default engine settings.
///
/// # Errors
///
/// Returns [`RequestError`] if the request is malformed.
pub fn scan(request: &ScanRequest, cancel: &CancelHandle) -> Result<ScanResult, RequestError> {
    ScanController::default().scan(request, cancel)
}
