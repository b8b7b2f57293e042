//! Duplicate finder implementation with multi-stage detection.
//!
//! # Overview
//!
//! [`DuplicateFinder`] runs the grouping pipeline over a flat list of
//! [`FileRecord`]s:
//!
//! 1. **Stage 1 - Size grouping**: bucket by exact size (see [`group_by_size`])
//! 2. **Stage 2 - Prehash**: BLAKE3 over the first 4 KiB, re-bucket by (size, prehash)
//! 3. **Stage 3 - Full hash**: BLAKE3 over the whole file, collapse hard links,
//!    apply the optional content-snippet filter, emit exact groups
//! 4. **Stage 4 - Metadata**: same lowercased name and size in different directories
//! 5. **Stage 5 - Fuzzy names**: pairs of near-identical names
//!
//! Each stage only sees files no earlier stage claimed.
//!
//! # Cancellation
//!
//! Hashing runs on a rayon pool bounded by `io_threads`. Every file task
//! polls the [`StopCondition`] before it starts; a hash already running is
//! allowed to finish. A bucket advances only when all of its members were
//! hashed or failed; if any member was skipped by a stop, the whole bucket is
//! dropped. Once a stop is seen, no later stage starts.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::duplicates::{DuplicateFinder, FinderConfig};
//! use dupescan::scanner::{Walker, WalkerConfig};
//! use dupescan::signal::StopCondition;
//! use std::path::Path;
//!
//! let outcome = Walker::new(Path::new("."), WalkerConfig::default()).walk();
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(2));
//! let (groups, stats) = finder.find_groups(outcome.files, &StopCondition::never());
//!
//! println!("{} groups, {} hard links collapsed", groups.len(), stats.hardlinks_collapsed);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use super::fuzzy::{FuzzyMatcher, DEFAULT_FUZZY_MAX_CANDIDATES, DEFAULT_FUZZY_THRESHOLD};
use super::groups::{group_by_size, ClaimedSet, DuplicateGroup, GroupingStats};
use super::metadata::find_metadata_groups;
use crate::progress::{phase, ProgressCallback};
use crate::scanner::{
    collapse_hardlinks, hash_to_hex, FileRecord, Hash, HashError, Hasher, PREHASH_SIZE,
};
use crate::signal::StopCondition;

/// Default number of concurrent hashing tasks.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Files above this size never enter the exact stages (1 GiB).
pub const DEFAULT_MAX_HASH_SIZE: u64 = 1024 * 1024 * 1024;

/// Leading bytes inspected by the content-snippet filter (64 KiB).
pub const DEFAULT_CONTENT_PEEK_SIZE: usize = 64 * 1024;

/// Configuration for the grouping engine.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Leading window hashed in stage 2.
    pub prehash_size: usize,
    /// Largest file size that is hashed at all.
    pub max_hash_size: u64,
    /// Byte snippet an exact group must contain near the start of a member.
    pub content_filter: Option<String>,
    /// Window searched by the content filter.
    pub content_peek_size: usize,
    /// Largest name distance reported by stage 5.
    pub fuzzy_threshold: usize,
    /// Cap on files compared in stage 5.
    pub fuzzy_max_candidates: usize,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("prehash_size", &self.prehash_size)
            .field("max_hash_size", &self.max_hash_size)
            .field("content_filter", &self.content_filter)
            .field("content_peek_size", &self.content_peek_size)
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .field("fuzzy_max_candidates", &self.fuzzy_max_candidates)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            prehash_size: PREHASH_SIZE,
            max_hash_size: DEFAULT_MAX_HASH_SIZE,
            content_filter: None,
            content_peek_size: DEFAULT_CONTENT_PEEK_SIZE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_max_candidates: DEFAULT_FUZZY_MAX_CANDIDATES,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the stage 2 window (at least 1 byte).
    #[must_use]
    pub fn with_prehash_size(mut self, size: usize) -> Self {
        self.prehash_size = size.max(1);
        self
    }

    /// Set the largest hashable file size.
    #[must_use]
    pub fn with_max_hash_size(mut self, size: u64) -> Self {
        self.max_hash_size = size;
        self
    }

    /// Set the content-snippet filter. Blank snippets disable it.
    #[must_use]
    pub fn with_content_filter(mut self, snippet: Option<String>) -> Self {
        self.content_filter = snippet.filter(|s| !s.is_empty());
        self
    }

    /// Set the window searched by the content filter.
    #[must_use]
    pub fn with_content_peek_size(mut self, size: usize) -> Self {
        self.content_peek_size = size.max(1);
        self
    }

    /// Set the fuzzy distance threshold.
    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: usize) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Set the fuzzy candidate cap.
    #[must_use]
    pub fn with_fuzzy_max_candidates(mut self, max: usize) -> Self {
        self.fuzzy_max_candidates = max;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Statistics from one hashing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashPhaseStats {
    /// Files that entered the stage
    pub input_files: usize,
    /// Files hashed successfully
    pub hashed_files: usize,
    /// Files dropped because of an I/O error
    pub failed_files: usize,
    /// Files never started because of a stop
    pub skipped_files: usize,
    /// Buckets dropped because a member was skipped
    pub dropped_buckets: usize,
    /// Files still in buckets of 2+ after the stage
    pub potential_duplicates: usize,
    /// Buckets of 2+ after the stage
    pub duplicate_groups: usize,
    /// Whether a stop cut the stage short
    pub interrupted: bool,
}

impl HashPhaseStats {
    /// Percentage of input files eliminated by this stage.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.input_files == 0 {
            0.0
        } else {
            let eliminated = self.input_files.saturating_sub(self.potential_duplicates);
            (eliminated as f64 / self.input_files as f64) * 100.0
        }
    }
}

/// Statistics from a full run of the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinderStats {
    /// Stage 1 counters
    pub size: GroupingStats,
    /// Stage 2 counters
    pub prehash: HashPhaseStats,
    /// Stage 3 counters
    pub fullhash: HashPhaseStats,
    /// Files above `max_hash_size`, kept out of stages 1-3
    pub oversized_files: usize,
    /// Entries folded into another entry of the same file
    pub hardlinks_collapsed: usize,
    /// Full-digest buckets rejected by the content filter
    pub content_filtered: usize,
    /// Exact groups emitted
    pub exact_groups: usize,
    /// Metadata groups emitted
    pub metadata_groups: usize,
    /// Fuzzy pairs emitted
    pub fuzzy_pairs: usize,
    /// Whether a stop ended the run before stage 5 finished
    pub interrupted: bool,
}

enum HashOutcome {
    Done(Hash),
    Failed,
    Skipped,
}

/// The five-stage grouping engine.
///
/// Holds no state between runs; every call to
/// [`find_groups`](Self::find_groups) owns its own buckets and claimed set.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new(FinderConfig::default())
    }
}

impl DuplicateFinder {
    /// Create a finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::new().with_prehash_size(config.prehash_size);
        Self { config, hasher }
    }

    /// Access the configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run all five stages over `files`.
    ///
    /// Groups come out as: exact groups (largest size first, then digest),
    /// metadata groups, then fuzzy pairs. Per-file I/O failures are logged
    /// and absorbed.
    #[must_use]
    pub fn find_groups(
        &self,
        files: Vec<FileRecord>,
        stop: &StopCondition,
    ) -> (Vec<DuplicateGroup>, FinderStats) {
        let mut stats = FinderStats::default();
        let mut claimed = ClaimedSet::new();
        let mut groups = Vec::new();

        log::info!("Grouping {} files", files.len());

        // Stage 1
        let mut hashable = Vec::with_capacity(files.len());
        for file in &files {
            if file.size > self.config.max_hash_size {
                stats.oversized_files += 1;
                log::trace!("Too large to hash: {}", file.path.display());
            } else {
                hashable.push(file.clone());
            }
        }
        let (size_groups, size_stats) = group_by_size(hashable);
        stats.size = size_stats;

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!(
                    "Failed to create hashing pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                None
            }
        };

        // Stage 2
        if stop.should_stop() {
            stats.interrupted = true;
            return (groups, stats);
        }
        let (prehash_buckets, prehash_stats) = self.hash_stage(
            pool.as_ref(),
            size_groups.into_iter().collect(),
            phase::PREHASH,
            stop,
            |path| self.hasher.prehash(path),
        );
        stats.prehash = prehash_stats;
        log::info!(
            "Stage 2 complete: {} files → {} candidates ({:.1}% eliminated)",
            stats.prehash.input_files,
            stats.prehash.potential_duplicates,
            stats.prehash.elimination_rate()
        );
        if stats.prehash.interrupted || stop.should_stop() {
            stats.interrupted = true;
            return (groups, stats);
        }

        // Stage 3
        let (full_buckets, fullhash_stats) = self.hash_stage(
            pool.as_ref(),
            prehash_buckets.into_iter().collect(),
            phase::FULLHASH,
            stop,
            |path| self.hasher.full_hash(path),
        );
        stats.fullhash = fullhash_stats;
        groups.extend(self.resolve_exact(full_buckets, &mut claimed, &mut stats));
        stats.exact_groups = groups.len();
        log::info!(
            "Stage 3 complete: {} exact groups, {} hard links collapsed",
            stats.exact_groups,
            stats.hardlinks_collapsed
        );
        if stats.fullhash.interrupted || stop.should_stop() {
            stats.interrupted = true;
            return (groups, stats);
        }

        // Stage 4
        self.phase_start(phase::METADATA, files.len());
        let metadata_groups = find_metadata_groups(&files, &mut claimed);
        self.phase_end(phase::METADATA);
        stats.metadata_groups = metadata_groups.len();
        groups.extend(metadata_groups);
        log::info!("Stage 4 complete: {} metadata groups", stats.metadata_groups);
        if stop.should_stop() {
            stats.interrupted = true;
            return (groups, stats);
        }

        // Stage 5
        let matcher = FuzzyMatcher::new(
            self.config.fuzzy_threshold,
            self.config.fuzzy_max_candidates,
        );
        self.phase_start(
            phase::FUZZY,
            files.len().saturating_sub(claimed.len()).min(matcher.max_candidates()),
        );
        let fuzzy = matcher.find_pairs(
            &files,
            &claimed,
            stop,
            self.config.progress_callback.as_deref(),
        );
        self.phase_end(phase::FUZZY);
        stats.fuzzy_pairs = fuzzy.pairs.len();
        stats.interrupted = fuzzy.interrupted;
        groups.extend(fuzzy.pairs);
        log::info!(
            "Stage 5 complete: {} candidates → {} fuzzy pairs",
            fuzzy.candidates,
            stats.fuzzy_pairs
        );

        (groups, stats)
    }

    /// Hash every file of every bucket and re-bucket by (key, digest).
    ///
    /// Buckets with a skipped member are dropped whole; failed members are
    /// dropped alone. Only buckets of 2+ are returned.
    fn hash_stage<K>(
        &self,
        pool: Option<&rayon::ThreadPool>,
        buckets: Vec<(K, Vec<FileRecord>)>,
        phase_name: &str,
        stop: &StopCondition,
        hash_fn: impl Fn(&Path) -> Result<Hash, HashError> + Sync,
    ) -> (BTreeMap<(K, Hash), Vec<FileRecord>>, HashPhaseStats)
    where
        K: Ord + Copy + Send + Sync,
    {
        let keys: Vec<K> = buckets.iter().map(|(key, _)| *key).collect();
        let tasks: Vec<(usize, FileRecord)> = buckets
            .into_iter()
            .enumerate()
            .flat_map(|(idx, (_, files))| files.into_iter().map(move |f| (idx, f)))
            .collect();

        let mut stats = HashPhaseStats {
            input_files: tasks.len(),
            ..Default::default()
        };
        if tasks.is_empty() {
            log::debug!("{}: no files to process", phase_name);
            return (BTreeMap::new(), stats);
        }

        self.phase_start(phase_name, tasks.len());
        log::debug!("{}: hashing {} files", phase_name, tasks.len());

        let callback = self.config.progress_callback.as_deref();
        let run = || -> Vec<(usize, FileRecord, HashOutcome)> {
            tasks
                .into_par_iter()
                .enumerate()
                .map(|(n, (idx, file))| {
                    if stop.should_stop() {
                        return (idx, file, HashOutcome::Skipped);
                    }
                    if let Some(callback) = callback {
                        callback.on_progress(n + 1, file.path.to_string_lossy().as_ref());
                    }
                    match hash_fn(&file.path) {
                        Ok(hash) => (idx, file, HashOutcome::Done(hash)),
                        Err(e) => {
                            log::warn!("Failed to hash {}: {}", file.path.display(), e);
                            (idx, file, HashOutcome::Failed)
                        }
                    }
                })
                .collect()
        };
        let results = match pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let incomplete: BTreeSet<usize> = results
            .iter()
            .filter(|(_, _, outcome)| matches!(outcome, HashOutcome::Skipped))
            .map(|(idx, _, _)| *idx)
            .collect();
        if !incomplete.is_empty() {
            stats.interrupted = true;
            stats.dropped_buckets = incomplete.len();
            log::info!(
                "{}: stopped early, dropping {} incomplete buckets",
                phase_name,
                incomplete.len()
            );
        }

        let mut regrouped: BTreeMap<(K, Hash), Vec<FileRecord>> = BTreeMap::new();
        for (idx, file, outcome) in results {
            match outcome {
                HashOutcome::Done(hash) => {
                    stats.hashed_files += 1;
                    if !incomplete.contains(&idx) {
                        regrouped.entry((keys[idx], hash)).or_default().push(file);
                    }
                }
                HashOutcome::Failed => stats.failed_files += 1,
                HashOutcome::Skipped => stats.skipped_files += 1,
            }
        }
        regrouped.retain(|_, files| files.len() >= 2);

        stats.duplicate_groups = regrouped.len();
        stats.potential_duplicates = regrouped.values().map(Vec::len).sum();

        self.phase_end(phase_name);
        (regrouped, stats)
    }

    /// Turn full-digest buckets into exact groups.
    fn resolve_exact(
        &self,
        buckets: BTreeMap<((u64, Hash), Hash), Vec<FileRecord>>,
        claimed: &mut ClaimedSet,
        stats: &mut FinderStats,
    ) -> Vec<DuplicateGroup> {
        let mut ordered: Vec<(u64, Hash, Vec<FileRecord>)> = buckets
            .into_iter()
            .map(|(((size, _), digest), files)| (size, digest, files))
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let needle = self.config.content_filter.as_deref().map(str::as_bytes);
        let mut groups = Vec::new();

        for (size, digest, files) in ordered {
            let total = files.len();
            let (kept, collapsed) = collapse_hardlinks(files);
            stats.hardlinks_collapsed += collapsed.len();

            if kept.len() < 2 {
                log::debug!(
                    "Dropping {}-byte bucket: {} entries are one file",
                    size,
                    total
                );
                continue;
            }

            if let Some(needle) = needle {
                let matched = kept.iter().any(|f| {
                    self.hasher
                        .prefix_contains(&f.path, needle, self.config.content_peek_size)
                });
                if !matched {
                    stats.content_filtered += 1;
                    log::debug!("Content filter rejected {}-byte bucket", size);
                    continue;
                }
            }

            claimed.claim_all(kept.iter().chain(&collapsed));
            if let Some(group) = DuplicateGroup::exact(hash_to_hex(&digest), kept) {
                groups.push(group);
            }
        }

        groups
    }

    fn phase_start(&self, phase_name: &str, total: usize) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(phase_name, total);
        }
    }

    fn phase_end(&self, phase_name: &str) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(phase_name);
        }
    }
}
