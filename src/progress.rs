//! Progress reporting for scan phases.
//!
//! The core reports through the [`ProgressCallback`] trait and never
//! touches the terminal itself. [`Progress`] is the `indicatif`
//! implementation used by the command-line front end.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Phase names reported to [`ProgressCallback::on_phase_start`].
pub mod phase {
    /// Directory traversal.
    pub const WALKING: &str = "walking";
    /// Partial-content digests (stage 2).
    pub const PREHASH: &str = "prehash";
    /// Full-content digests (stage 3).
    pub const FULLHASH: &str = "fullhash";
    /// Name and size matching (stage 4).
    pub const METADATA: &str = "metadata";
    /// Pairwise name distance (stage 5).
    pub const FUZZY: &str = "fuzzy";
}

/// Progress callback for scan phases.
///
/// Implement this trait to receive progress updates during a scan.
/// Callbacks may be invoked from hashing worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (see [`phase`])
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Phases run one after another, so a single bar is active at a time.
pub struct Progress {
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupescan::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            active: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn replace_active(&self, bar: Option<ProgressBar>) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.take() {
                previous.finish_and_clear();
            }
            *active = bar;
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == phase::WALKING {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::walking_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(phase.to_string());
        self.replace_active(Some(pb));
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Ok(active) = self.active.lock() {
            if let Some(ref pb) = *active {
                pb.set_position(current as u64);
                pb.set_message(truncate_path(path, 30));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        log::trace!("Progress phase finished: {}", phase);
        self.replace_active(None);
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Ok(active) = self.active.lock() {
            if let Some(ref pb) = *active {
                pb.set_message(message.to_string());
            }
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
