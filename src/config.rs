//! Application configuration management.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. `DUPESCAN_*` environment variables
//! 4. Command-line flags (applied by the caller)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::controller::{ScanSettings, DEFAULT_TIMEOUT};
use crate::duplicates::{
    DEFAULT_CONTENT_PEEK_SIZE, DEFAULT_FUZZY_MAX_CANDIDATES, DEFAULT_FUZZY_THRESHOLD,
    DEFAULT_IO_THREADS, DEFAULT_MAX_HASH_SIZE,
};
use crate::scanner::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILES, PREHASH_SIZE};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "DUPESCAN_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest directory level listed (root = 0).
    pub max_depth: usize,
    /// Stop walking once this many files are collected.
    pub max_files: usize,
    /// Overall scan timeout in milliseconds.
    pub timeout_ms: u64,
    /// Number of I/O threads for hashing.
    pub io_threads: usize,
    /// Leading bytes hashed by the prehash stage.
    pub prehash_size: usize,
    /// Files larger than this are never hashed.
    pub max_hash_size: u64,
    /// Leading bytes searched by the content filter.
    pub content_peek_size: usize,
    /// Largest name distance reported as a fuzzy pair.
    pub fuzzy_threshold: usize,
    /// Cap on files compared by the fuzzy stage.
    pub fuzzy_max_candidates: usize,
    /// Follow symbolic links during scan.
    pub follow_symlinks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_files: DEFAULT_MAX_FILES,
            timeout_ms: u64::try_from(DEFAULT_TIMEOUT.as_millis()).unwrap_or(60_000),
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

impl Config {
    /// Load the merged configuration.
    ///
    /// An explicit `path` must exist; the default platform path is used
    /// only when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, or if any layer
    /// holds a value of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default_path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", default_path.display());
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("Invalid configuration")
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupescan", "dupescan")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            io_threads: self.io_threads.max(1),
            prehash_size: self.prehash_size.max(1),
            max_hash_size: self.max_hash_size,
            content_peek_size: self.content_peek_size.max(1),
            fuzzy_threshold: self.fuzzy_threshold,
            fuzzy_max_candidates: self.fuzzy_max_candidates,
            follow_symlinks: self.follow_symlinks,
        }
    }
}
