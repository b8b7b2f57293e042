//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] computes two kinds of digest:
//! - a **prehash** over the leading window of a file (4 KiB by default),
//!   used as a cheap pre-filter
//! - a **full hash** streamed over the whole file in fixed-size chunks
//!
//! Only the full 32-byte digest is ever used as an equality key.
//! [`short_hex`] exists purely for display.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let hash = hasher.full_hash(Path::new("Cargo.toml")).unwrap();
//! println!("{}", hash_to_hex(&hash));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::HashError;

/// A BLAKE3 digest.
pub type Hash = [u8; 32];

/// Default size of the leading window hashed by [`Hasher::prehash`].
pub const PREHASH_SIZE: usize = 4096;

/// Number of hex characters shown when a hash is displayed.
pub const DISPLAY_HASH_LEN: usize = 12;

/// Read buffer size for streaming hashes.
const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    prehash_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default prehash window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prehash_size: PREHASH_SIZE,
        }
    }

    /// Use a custom prehash window (at least one byte).
    #[must_use]
    pub fn with_prehash_size(mut self, size: usize) -> Self {
        self.prehash_size = size.max(1);
        self
    }

    /// Size of the prehash window in bytes.
    #[must_use]
    pub fn prehash_size(&self) -> usize {
        self.prehash_size
    }

    /// Hash the leading window of a file, or the whole file if it is smaller.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Hash, HashError> {
        let prefix = self.read_prefix(path, self.prehash_size)?;
        Ok(*blake3::hash(&prefix).as_bytes())
    }

    /// Hash the entire content of a file, streaming in 64 KiB chunks.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Read up to `limit` leading bytes of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn read_prefix(&self, path: &Path, limit: usize) -> Result<Vec<u8>, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut prefix = Vec::with_capacity(limit.min(CHUNK_SIZE));
        file.take(limit as u64)
            .read_to_end(&mut prefix)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok(prefix)
    }

    /// Check whether the leading `window` bytes of a file contain `needle`.
    ///
    /// Unreadable files never match.
    #[must_use]
    pub fn prefix_contains(&self, path: &Path, needle: &[u8], window: usize) -> bool {
        if needle.is_empty() {
            return true;
        }
        match self.read_prefix(path, window) {
            Ok(prefix) => prefix.windows(needle.len()).any(|w| w == needle),
            Err(e) => {
                log::warn!("Failed to read prefix of {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Format a hash as a lowercase hex string (64 characters).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Shorten a hash key for display. Never use the result for comparison.
#[must_use]
pub fn short_hex(key: &str) -> &str {
    match key.char_indices().nth(DISPLAY_HASH_LEN) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}
