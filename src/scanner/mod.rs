//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Bounded directory walking using walkdir
//! - Partial and full content hashing with BLAKE3
//! - Hard link identity tracking
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//! - [`hardlink`]: On-disk file identity and hard link collapse
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     max_depth: 3,
//!     extension_filter: Some("pdf".to_string()),
//!     ..Default::default()
//! };
//!
//! let outcome = Walker::new(Path::new("."), config).walk();
//! for file in &outcome.files {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! println!("{} entries visited", outcome.entries_visited);
//! ```

pub mod hardlink;
pub mod hasher;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

// Re-export main types
pub use hardlink::{collapse_hardlinks, FileIdentity, HardlinkTracker};
pub use hasher::{hash_to_hex, short_hex, Hash, Hasher, DISPLAY_HASH_LEN, PREHASH_SIZE};
pub use walker::{WalkOutcome, Walker};

/// Extensions treated as executable content, compared lowercased.
pub const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "msi", "bat", "cmd", "com", "scr", "ps1", "vbs", "sh", "app", "jar", "bin", "run",
    "apk",
];

/// Directory names that never contain user content worth comparing.
///
/// Version-control metadata, dependency caches and build caches are
/// skipped no matter which filters are active.
pub const SKIPPED_DIRECTORIES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "__pycache__",
    ".cache",
    ".gradle",
    ".next",
    ".pytest_cache",
    ".tox",
];

/// Metadata for a discovered file.
///
/// Created once during traversal and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Base name of the file
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    #[serde(rename = "mtime", serialize_with = "serialize_mtime")]
    pub modified: SystemTime,
    /// On-disk identity, when the platform exposes one
    #[serde(skip)]
    pub identity: Option<FileIdentity>,
    /// Whether the extension marks the file as executable
    pub is_executable: bool,
}

impl FileRecord {
    /// Create a new FileRecord without an on-disk identity.
    ///
    /// The base name and executable flag are derived from `path`.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_executable = is_executable_name(&name);
        Self {
            path,
            name,
            size,
            modified,
            identity: None,
            is_executable,
        }
    }

    /// Attach the on-disk identity used for hard link collapse.
    #[must_use]
    pub fn with_identity(mut self, identity: Option<FileIdentity>) -> Self {
        self.identity = identity;
        self
    }

    /// Lowercased base name, the key for metadata and fuzzy matching.
    #[must_use]
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Directory containing the file.
    #[must_use]
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Modification time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn mtime_millis(&self) -> u64 {
        system_time_to_millis(self.modified)
    }
}

/// Check whether a file name carries an executable extension.
#[must_use]
pub fn is_executable_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| EXECUTABLE_EXTENSIONS.contains(&e.as_str()))
}

/// Convert a timestamp to whole milliseconds since the Unix epoch.
///
/// Times before the epoch clamp to zero.
#[must_use]
pub fn system_time_to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn serialize_mtime<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(system_time_to_millis(*time))
}

/// Default deepest directory level listed.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Default cap on collected files.
pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Configuration for directory walking.
///
/// Controls traversal bounds, name/extension filtering and symlink handling.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Deepest directory level whose entries are listed (root = 0).
    pub max_depth: usize,

    /// Stop collecting once this many files have been recorded.
    pub max_files: usize,

    /// Case-insensitive substring the base name must contain.
    pub name_filter: Option<String>,

    /// Case-insensitive extension, with or without a leading dot.
    pub extension_filter: Option<String>,

    /// Follow symbolic links during traversal.
    /// Directory loops are detected and skipped.
    pub follow_symlinks: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            name_filter: None,
            extension_filter: None,
            follow_symlinks: false,
        }
    }
}

impl WalkerConfig {
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

    /// Set the name substring filter. Blank filters are ignored.
    #[must_use]
    pub fn with_name_filter(mut self, filter: Option<String>) -> Self {
        self.name_filter = filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        self
    }

    /// Set the extension filter. `".PDF"`, `"pdf"` and `"Pdf"` are equivalent.
    #[must_use]
    pub fn with_extension_filter(mut self, filter: Option<String>) -> Self {
        self.extension_filter = filter.and_then(|f| normalize_extension(&f));
        self
    }

    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Normalize filters that were assigned directly to the public fields.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let name_filter = self.name_filter.take();
        let extension_filter = self.extension_filter.take();
        self.with_name_filter(name_filter)
            .with_extension_filter(extension_filter)
    }
}

/// Normalize an extension filter: trim, drop leading dots, lowercase.
#[must_use]
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Errors that can occur during directory scanning.
///
/// The walker never stops on these; they are logged and counted.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The entry vanished between listing and stat.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Following a symlink led back to one of its ancestors.
    #[error("Filesystem loop at {path} (points to {ancestor})")]
    Loop {
        /// Path of the looping entry
        path: PathBuf,
        /// Ancestor directory it resolves to
        ancestor: PathBuf,
    },

    /// An I/O error occurred while accessing an entry.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
