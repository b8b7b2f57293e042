//! Command-line interface definitions for dupescan.
//!
//! This module defines all CLI arguments and subcommands using the clap
//! derive API. Bounds left unset on the command line fall back to the
//! layered configuration (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Scan a directory with text output (default)
//! dupescan scan ~/Downloads
//!
//! # Only PDFs, JSON for scripting, 5 second budget
//! dupescan scan ~/Downloads --ext pdf --output json --timeout-ms 5000
//!
//! # Show the effective configuration
//! dupescan config
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Find duplicate and near-duplicate files in a bounded directory tree.
///
/// Files are matched by content (BLAKE3), by name and size, and by
/// near-identical names. Nothing is ever modified.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Deepest directory level to list (the root is level 0)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Stop collecting after this many files
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// Only consider files whose name contains this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,

    /// Only consider files with this extension (e.g. pdf or .pdf)
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: Option<String>,

    /// Keep exact groups only if a member starts with content containing TEXT
    #[arg(long, value_name = "TEXT")]
    pub content: Option<String>,

    /// Overall scan timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Number of I/O threads for hashing
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Largest file to hash (e.g., 100MB, 1GiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_hash_size: Option<u64>,

    /// Follow symbolic links during scan (directory loops are skipped)
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupescan::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1GiB").unwrap(), 1_073_741_824);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
