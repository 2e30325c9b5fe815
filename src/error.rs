//! Exit codes and structured error output.

use serde::Serialize;

use crate::archiver::RunReport;

/// Exit codes for the RustVault application.
///
/// - 0: Success (every candidate handled without a fault)
/// - 1: General error (startup failure, nothing or little was done)
/// - 3: Partial success (run finished, some files were skipped on errors)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without faults.
    Success = 0,
    /// General error: a fatal error stopped the run.
    GeneralError = 1,
    /// Partial success: the run completed but some files faulted.
    PartialSuccess = 3,
    /// Interrupted: the run was stopped by Ctrl+C.
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
            Self::Success => "RV000",
            Self::GeneralError => "RV001",
            Self::PartialSuccess => "RV003",
            Self::Interrupted => "RV130",
        }
    }

    /// Exit code for a finished run. Interruption wins over faults.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        if report.interrupted {
            Self::Interrupted
        } else if report.has_faults() {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RV001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
