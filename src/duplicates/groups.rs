//! Duplicate groups and size-based file organization.
//!
//! # Overview
//!
//! This module provides the [`DuplicateGroup`] produced by every stage of
//! the grouping engine, the size bucketing used by stage 1, and the
//! [`ClaimedSet`] that keeps the stages from sharing files.
//!
//! ## Size Grouping (Stage 1)
//!
//! Files with different sizes cannot have identical content, so a size
//! seen only once is eliminated before any file is opened.
//!
//! # Example
//!
//! ```
//! use dupescan::scanner::FileRecord;
//! use dupescan::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::{short_hex, FileRecord};

/// Grouping key used by every metadata group.
pub const METADATA_KEY: &str = "metadata";

/// Grouping key used by every fuzzy name group.
pub const FUZZY_KEY: &str = "fuzzy";

/// How the members of a group were matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Identical full-content digest
    Exact,
    /// Same lowercased name and size in different directories, content unread
    Metadata,
    /// Nearly identical names
    FuzzyName,
}

impl MatchType {
    /// Wire name of the match type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Metadata => "metadata",
            MatchType::FuzzyName => "fuzzy_name",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of files the engine considers duplicates of each other.
///
/// Always holds at least two files, ordered by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Full content digest in hex for exact groups, otherwise
    /// [`METADATA_KEY`] or [`FUZZY_KEY`]
    pub hash: String,
    /// How the files were matched
    pub match_type: MatchType,
    /// Member files, ordered by path
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create an exact-content group keyed by the full hex digest.
    ///
    /// Returns `None` if fewer than two files are supplied.
    #[must_use]
    pub fn exact(hash_hex: String, files: Vec<FileRecord>) -> Option<Self> {
        Self::build(hash_hex, MatchType::Exact, files)
    }

    /// Create a metadata group. Returns `None` for fewer than two files.
    #[must_use]
    pub fn metadata(files: Vec<FileRecord>) -> Option<Self> {
        Self::build(METADATA_KEY.to_string(), MatchType::Metadata, files)
    }

    /// Create a fuzzy name pair.
    #[must_use]
    pub fn fuzzy_pair(a: FileRecord, b: FileRecord) -> Self {
        let mut files = vec![a, b];
        files.sort_by(|x, y| x.path.cmp(&y.path));
        Self {
            hash: FUZZY_KEY.to_string(),
            match_type: MatchType::FuzzyName,
            files,
        }
    }

    fn build(hash: String, match_type: MatchType, mut files: Vec<FileRecord>) -> Option<Self> {
        if files.len() < 2 {
            return None;
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Some(Self {
            hash,
            match_type,
            files,
        })
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Shortened key for display only.
    #[must_use]
    pub fn display_hash(&self) -> &str {
        short_hex(&self.hash)
    }

    /// Check whether the group contains a path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Paths already placed in a group by an earlier stage.
///
/// The first stage that claims a file wins; later stages only see
/// unclaimed files.
#[derive(Debug, Default, Clone)]
pub struct ClaimedSet {
    paths: HashSet<PathBuf>,
}

impl ClaimedSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every file in `files`.
    pub fn claim_all<'a>(&mut self, files: impl IntoIterator<Item = &'a FileRecord>) {
        for file in files {
            self.paths.insert(file.path.clone());
        }
    }

    /// Check whether a file has been claimed.
    #[must_use]
    pub fn is_claimed(&self, file: &FileRecord) -> bool {
        self.paths.contains(&file.path)
    }

    /// Keep only the unclaimed files.
    #[must_use]
    pub fn unclaimed<'a>(&self, files: &'a [FileRecord]) -> Vec<&'a FileRecord> {
        files.iter().filter(|f| !self.is_claimed(f)).collect()
    }

    /// Number of claimed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if nothing has been claimed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Number of distinct file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as the only file of their size
    pub eliminated_unique: usize,
    /// Number of empty files seen (bucketed like any other size)
    pub empty_files: usize,
    /// Number of size buckets with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size (stage 1 of duplicate detection).
///
/// Returns only buckets holding two or more files, keyed by size in
/// ascending order. Empty files share size 0 and bucket together.
///
/// # Example
///
/// ```
/// use dupescan::scanner::FileRecord;
/// use dupescan::duplicates::group_by_size;
/// use std::path::PathBuf;
/// use std::time::SystemTime;
///
/// let files = vec![
///     FileRecord::new(PathBuf::from("/a.txt"), 100, SystemTime::now()),
///     FileRecord::new(PathBuf::from("/b.txt"), 100, SystemTime::now()),
///     FileRecord::new(PathBuf::from("/c.txt"), 200, SystemTime::now()),
/// ];
///
/// let (groups, stats) = group_by_size(files);
///
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[&100].len(), 2);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (BTreeMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut all_groups: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;

        if file.size == 0 {
            stats.empty_files += 1;
        }

        all_groups.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_groups.len();

    let filtered: BTreeMap<u64, Vec<FileRecord>> = all_groups
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!("Size bucket {} bytes: {} candidates", size, files.len());
                true
            }
        })
        .collect();

    log::info!(
        "Stage 1 complete: {} files → {} candidates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (filtered, stats)
}
