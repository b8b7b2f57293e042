//! Hard link detection for avoiding false duplicate identification.
//!
//! # Overview
//!
//! Hard links are multiple directory entries pointing to the same inode on disk.
//! They share the same content but are NOT duplicates - they're the same file.
//! The walker records a [`FileIdentity`] for every file; the grouping engine
//! collapses entries sharing an identity before a group is emitted.
//!
//! # Platform Support
//!
//! - **Unix**: Uses (device_id, inode) pairs from file metadata
//! - **Other**: No identity is recorded (every entry is treated as distinct)
//!
//! # Example
//!
//! ```
//! use dupescan::scanner::hardlink::{collapse_hardlinks, FileIdentity};
//! use dupescan::scanner::FileRecord;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let id = Some(FileIdentity::new(1, 42));
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/a.txt"), 5, SystemTime::now()).with_identity(id),
//!     FileRecord::new(PathBuf::from("/b.txt"), 5, SystemTime::now()).with_identity(id),
//! ];
//!
//! let (kept, collapsed) = collapse_hardlinks(files);
//! assert_eq!(kept.len(), 1);
//! assert_eq!(collapsed.len(), 1);
//! ```

use std::collections::HashSet;
use std::fs::Metadata;

use super::FileRecord;

/// Platform-specific identity of the underlying file.
///
/// On Unix, this is (device_id, inode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Build an identity from raw device and inode numbers.
    #[must_use]
    pub const fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    /// Create an identity from file metadata.
    ///
    /// Returns `None` if the platform doesn't support inode tracking.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Create an identity from file metadata.
    ///
    /// Stable file indices are not exposed by std on this platform.
    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Tracks seen identities to detect hard links.
///
/// Files with the same identity are hard links to the same underlying data.
/// The tracker remembers which identities have been seen and reports
/// subsequent occurrences as hard links.
///
/// # Thread Safety
///
/// `HardlinkTracker` is NOT thread-safe. Create one per bucket or use
/// external synchronization if sharing across threads.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashSet<FileIdentity>,
}

impl HardlinkTracker {
    /// Create a new hard link tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Create a tracker with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Check if a record is a hard link to a previously seen record.
    ///
    /// Records without an identity are never reported as hard links.
    /// The first occurrence of an identity is recorded for future lookups.
    pub fn is_hardlink(&mut self, record: &FileRecord) -> bool {
        match record.identity {
            Some(identity) => !self.seen.insert(identity),
            None => false,
        }
    }

    /// Get the number of unique identities tracked.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Check if hard link detection is supported on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

/// Collapse records sharing an on-disk identity to a single representative.
///
/// Returns `(kept, collapsed)`: the first record seen for every identity,
/// and the later entries that pointed at an already-kept file. Input order
/// is preserved in both lists.
#[must_use]
pub fn collapse_hardlinks(files: Vec<FileRecord>) -> (Vec<FileRecord>, Vec<FileRecord>) {
    let mut tracker = HardlinkTracker::with_capacity(files.len());
    let mut kept = Vec::with_capacity(files.len());
    let mut collapsed = Vec::new();

    for file in files {
        if tracker.is_hardlink(&file) {
            log::debug!("Collapsing hard link: {}", file.path.display());
            collapsed.push(file);
        } else {
            kept.push(file);
        }
    }

    (kept, collapsed)
}
