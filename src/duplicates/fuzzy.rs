//! Fuzzy name pairs (stage 5).
//!
//! Compares the lowercased base names of unclaimed files pairwise with
//! Levenshtein distance. The comparison is quadratic, so the candidate list
//! is sorted by path and capped before any pair is scored.
//!
//! Every qualifying pair is its own two-member group. Chains are never
//! merged: if A is near B and B is near C but A is not near C, two pairs
//! come out.
//!
//! # Example
//!
//! ```
//! use dupescan::duplicates::{ClaimedSet, FuzzyMatcher};
//! use dupescan::scanner::FileRecord;
//! use dupescan::signal::StopCondition;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/invoice1.pdf"), 100, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/invoice2.pdf"), 250, SystemTime::now()),
//! ];
//!
//! let outcome = FuzzyMatcher::default().find_pairs(
//!     &files,
//!     &ClaimedSet::new(),
//!     &StopCondition::never(),
//!     None,
//! );
//! assert_eq!(outcome.pairs.len(), 1);
//! ```

use crate::progress::ProgressCallback;
use crate::scanner::FileRecord;
use crate::signal::StopCondition;

use super::groups::{ClaimedSet, DuplicateGroup};

/// Largest name distance still reported as a pair.
pub const DEFAULT_FUZZY_THRESHOLD: usize = 3;

/// Cap on files entering the pairwise comparison.
pub const DEFAULT_FUZZY_MAX_CANDIDATES: usize = 500;

/// Edit distance between two names (substitution, insertion, deletion).
#[must_use]
pub fn name_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Result of one fuzzy pass.
#[derive(Debug, Clone, Default)]
pub struct FuzzyOutcome {
    /// Emitted pairs in discovery order
    pub pairs: Vec<DuplicateGroup>,
    /// Files actually compared
    pub candidates: usize,
    /// Whether the candidate list was cut to the cap
    pub truncated: bool,
    /// Whether the stop condition ended the pass early
    pub interrupted: bool,
}

/// Pairwise name matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    threshold: usize,
    max_candidates: usize,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            max_candidates: DEFAULT_FUZZY_MAX_CANDIDATES,
        }
    }
}

impl FuzzyMatcher {
    /// Create a matcher with explicit bounds.
    #[must_use]
    pub fn new(threshold: usize, max_candidates: usize) -> Self {
        Self {
            threshold,
            max_candidates,
        }
    }

    /// Largest accepted distance.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Candidate cap.
    #[must_use]
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Distance between two name keys if it is in `1..=threshold`.
    #[must_use]
    pub fn pair_distance(&self, a: &str, b: &str) -> Option<usize> {
        let distance = name_distance(a, b);
        (distance > 0 && distance <= self.threshold).then_some(distance)
    }

    /// Find near-name pairs among the unclaimed files.
    ///
    /// The stop condition is polled before each row; pairs found before a
    /// stop are kept. Two entries for the same on-disk file never pair.
    pub fn find_pairs(
        &self,
        files: &[FileRecord],
        claimed: &ClaimedSet,
        stop: &StopCondition,
        progress: Option<&dyn ProgressCallback>,
    ) -> FuzzyOutcome {
        let mut candidates = claimed.unclaimed(files);
        candidates.sort_by(|a, b| a.path.cmp(&b.path));

        let mut outcome = FuzzyOutcome {
            truncated: candidates.len() > self.max_candidates,
            ..Default::default()
        };
        if outcome.truncated {
            log::debug!(
                "Fuzzy candidates capped at {} of {}",
                self.max_candidates,
                candidates.len()
            );
        }
        candidates.truncate(self.max_candidates);
        outcome.candidates = candidates.len();

        if self.threshold == 0 {
            return outcome;
        }

        let keys: Vec<(String, usize)> = candidates
            .iter()
            .map(|f| {
                let key = f.name_key();
                let len = key.chars().count();
                (key, len)
            })
            .collect();

        for (i, left) in candidates.iter().enumerate() {
            if stop.should_stop() {
                outcome.interrupted = true;
                log::info!("Stage 5 interrupted after {} of {} rows", i, candidates.len());
                break;
            }
            if let Some(callback) = progress {
                callback.on_progress(i + 1, left.path.to_string_lossy().as_ref());
            }

            let (left_key, left_len) = &keys[i];
            for (j, right) in candidates.iter().enumerate().skip(i + 1) {
                let (right_key, right_len) = &keys[j];
                if left_len.abs_diff(*right_len) > self.threshold {
                    continue;
                }
                if left.identity.is_some() && left.identity == right.identity {
                    continue;
                }

                if let Some(distance) = self.pair_distance(left_key, right_key) {
                    log::trace!(
                        "Fuzzy pair (distance {}): {} ~ {}",
                        distance,
                        left.path.display(),
                        right.path.display()
                    );
                    outcome
                        .pairs
                        .push(DuplicateGroup::fuzzy_pair((*left).clone(), (*right).clone()));
                }
            }
        }

        outcome
    }
}
