//! JSON output formatter for scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "success": true,
//!   "groups": [
//!     {
//!       "hash": "af1349b9f5f9a1a6a0404dea36dcc949...",
//!       "matchType": "exact",
//!       "files": [
//!         { "path": "/data/a.txt", "name": "a.txt", "size": 5,
//!           "mtime": 1700000000000, "isExecutable": false }
//!       ]
//!     }
//!   ],
//!   "stats": {
//!     "scanned": 3, "matched": 2, "groups": 1,
//!     "totalDuplicates": 1, "elapsedMs": 4, "timedOut": false
//!   }
//! }
//! ```
//!
//! `hash` is the full 64-character digest for exact groups and the literal
//! `"metadata"` or `"fuzzy"` otherwise. `mtime` is milliseconds since the
//! Unix epoch.

use std::io::Write;

use serde::Serialize;

use crate::controller::{ScanResult, ScanStats};
use crate::duplicates::DuplicateGroup;

/// Complete JSON document for one scan.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Always `true`: only configuration errors fail, and those never
    /// produce a result
    pub success: bool,
    /// Duplicate groups in result order
    pub groups: &'a [DuplicateGroup],
    /// Scan statistics
    pub stats: &'a ScanStats,
}

impl<'a> JsonOutput<'a> {
    /// Create a JSON view of a scan result.
    #[must_use]
    pub fn new(result: &'a ScanResult) -> Self {
        Self {
            success: true,
            groups: &result.groups,
            stats: &result.stats,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to (e.g., stdout)
    /// * `pretty` - Whether to pretty-print the output
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
