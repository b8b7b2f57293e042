//! Structured error handling and exit codes.

use serde::Serialize;

use crate::controller::ScanResult;
use crate::signal::StopReason;

/// Exit codes for the dupescan binary.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (bad request, bad configuration, unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (the deadline cut the scan short)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and duplicates were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Partial success: Scan hit its deadline and returned a partial result.
    PartialSuccess = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DS000",
            Self::GeneralError => "DS001",
            Self::NoDuplicates => "DS002",
            Self::PartialSuccess => "DS003",
            Self::Interrupted => "DS130",
        }
    }

    /// Pick the exit code for a finished scan.
    #[must_use]
    pub fn for_result(result: &ScanResult) -> Self {
        match result.stop_reason {
            Some(StopReason::Cancelled) => Self::Interrupted,
            Some(StopReason::DeadlineExceeded) => Self::PartialSuccess,
            None if result.has_duplicates() => Self::Success,
            None => Self::NoDuplicates,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Always `false`
    pub success: bool,
    /// The error code (e.g., "DS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            success: false,
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
        }
    }
}
