//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (Stage 1)
//! - Prehash and full-hash comparison with hard link collapse (Stages 2-3)
//! - Name and size matching (Stage 4)
//! - Near-identical name pairs (Stage 5)
//! - Duplicate group management

pub mod finder;
pub mod fuzzy;
pub mod groups;
pub mod metadata;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderStats, HashPhaseStats, DEFAULT_CONTENT_PEEK_SIZE,
    DEFAULT_IO_THREADS, DEFAULT_MAX_HASH_SIZE,
};
pub use fuzzy::{
    name_distance, FuzzyMatcher, FuzzyOutcome, DEFAULT_FUZZY_MAX_CANDIDATES,
    DEFAULT_FUZZY_THRESHOLD,
};
pub use groups::{
    group_by_size, ClaimedSet, DuplicateGroup, GroupingStats, MatchType, FUZZY_KEY, METADATA_KEY,
};
pub use metadata::find_metadata_groups;
