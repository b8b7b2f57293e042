//! Cancellation and deadline handling.
//!
//! A scan is stopped cooperatively: the walker polls between directory
//! entries and the grouping engine polls between file-level hash operations.
//! Two sources can stop a scan:
//!
//! - a [`CancelHandle`], an `AtomicBool` flag owned by the caller and shared
//!   with worker threads
//! - the wall-clock deadline of the scan
//!
//! [`StopCondition`] combines both into the single object the core polls.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupescan::signal::{install_handler, StopCondition};
//! use std::time::Duration;
//!
//! // Ctrl+C sets the flag on the returned handle
//! let handle = install_handler().expect("Failed to install signal handler");
//!
//! let stop = StopCondition::new(&handle).with_timeout(Duration::from_secs(60));
//! if stop.should_stop() {
//!     println!("Scan would stop here");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Caller-owned cancellation handle for one scan.
///
/// Cloning shares the underlying flag, so a calling layer can keep one clone
/// and hand another to the scan. Each scan should get its own handle; the
/// core never keeps a registry of them.
///
/// # Example
///
/// ```rust
/// use dupescan::signal::CancelHandle;
///
/// let handle = CancelHandle::new();
/// let for_scan = handle.clone();
///
/// handle.cancel();
/// assert!(for_scan.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a new handle with no cancellation requested.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation of the scan using this handle.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the underlying flag for passing to worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the flag to `false`.
    ///
    /// This is primarily useful for reusing the process-wide Ctrl+C handle.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a scan stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The caller cancelled through its [`CancelHandle`].
    Cancelled,
    /// The scan's wall-clock deadline passed.
    DeadlineExceeded,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Cancellation flag plus an optional deadline, polled by the core.
///
/// There is one deadline per scan, not per stage.
#[derive(Debug, Clone)]
pub struct StopCondition {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopCondition {
    /// Create a stop condition driven only by the handle's flag.
    #[must_use]
    pub fn new(handle: &CancelHandle) -> Self {
        Self {
            flag: handle.get_flag(),
            deadline: None,
        }
    }

    /// A condition that never fires. Useful for tests and tools.
    #[must_use]
    pub fn never() -> Self {
        Self::new(&CancelHandle::new())
    }

    /// Set the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        self.with_deadline(deadline)
    }

    /// Set an absolute deadline. `None` removes it.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Why the scan must stop, or `None` to keep going.
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        if self.flag.load(Ordering::SeqCst) {
            Some(StopReason::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(StopReason::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Check if the scan must stop.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.reason().is_some()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLE: OnceLock<CancelHandle> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned handle.
///
/// The OS hook can only be registered once per process. Later calls reset
/// and return the same handle; if another hook was registered elsewhere, an
/// unhooked handle is returned so manual cancellation still works.
///
/// # Errors
///
/// Currently always succeeds; the `Result` is kept so a calling layer can
/// treat a missing hook as fatal if it wants to.
pub fn install_handler() -> Result<CancelHandle, SignalError> {
    if let Some(handle) = GLOBAL_HANDLE.get() {
        handle.reset();
        return Ok(handle.clone());
    }

    let handle = CancelHandle::new();
    let flag = handle.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current files...");
        let _ = std::io::stderr().flush();

        log::info!("Cancellation signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLE.set(handle.clone());
            Ok(handle)
        }
        Err(e) => {
            if let Some(existing) = GLOBAL_HANDLE.get() {
                existing.reset();
                Ok(existing.clone())
            } else {
                log::debug!("Ctrl+C handler already registered ({}), using unhooked handle", e);
                let fallback = CancelHandle::new();
                let _ = GLOBAL_HANDLE.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}
