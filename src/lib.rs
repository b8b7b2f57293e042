//! dupescan - bounded duplicate file detection
//!
//! Finds duplicate and near-duplicate files inside a size- and time-bounded
//! directory tree. Files are matched by content (BLAKE3, after a cheap
//! size and prefix pre-filter), by name and size, and by near-identical
//! names. A scan can be cancelled or run out of time and still returns the
//! groups it had fully resolved.
//!
//! The library entry point is [`controller::scan`]; [`run_app`] is the
//! command-line front end.

pub mod cli;
pub mod config;
pub mod controller;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::controller::{ScanController, ScanRequest};
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run the command-line application.
///
/// # Errors
///
/// Returns an error for a bad configuration, a malformed scan request, or
/// a failure to write the output.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Scan(ref args) => run_scan(args, &config, cli.quiet),
    }
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let mut config = config.clone();
    if let Some(threads) = args.io_threads {
        config.io_threads = threads;
    }
    if let Some(size) = args.max_hash_size {
        config.max_hash_size = size;
    }
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }

    let request = ScanRequest::new(&args.path)
        .with_max_depth(args.max_depth.unwrap_or(config.max_depth))
        .with_max_files(args.max_files.unwrap_or(config.max_files))
        .with_name_filter(args.name.clone())
        .with_extension_filter(args.extension.clone())
        .with_content_filter(args.content.clone())
        .with_timeout(Duration::from_millis(
            args.timeout_ms.unwrap_or(config.timeout_ms),
        ));

    let cancel = signal::install_handler()?;

    let show_progress = !quiet && args.output == OutputFormat::Text;
    let mut controller = ScanController::new(config.scan_settings());
    if show_progress {
        controller = controller.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let result = controller
        .scan(&request, &cancel)
        .with_context(|| format!("Cannot scan {}", args.path.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => JsonOutput::new(&result).write_to(&mut out, true)?,
        OutputFormat::Text => TextOutput::new(&result).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(ExitCode::for_result(&result))
}
