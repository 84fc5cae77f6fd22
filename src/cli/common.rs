//! Shared CLI plumbing: the command error type, exit codes, and the
//! JSON-serializable run report.

use serde::Serialize;
use std::fmt;

use crate::runner::RunReport;

/// Process exit codes reported by the CLI.
///
/// `0` means every selected board succeeded. `1` is a validation failure
/// (bad configuration, a failed board, or warnings under `--strict`).
/// `2` is an I/O failure such as a missing config directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every selected board compiled (and wrote, for generate) cleanly.
    Success = 0,
    /// Configuration or compilation failure.
    ValidationFailure = 1,
    /// Filesystem failure reading configuration or writing output.
    IoError = 2,
}

impl ExitCode {
    /// Numeric code passed to `std::process::exit`.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Error from a CLI command, carrying the exit code to report.
#[derive(Debug)]
pub struct CliError {
    /// Exit code the process should terminate with.
    pub exit_code: ExitCode,
    /// Message printed to stderr.
    pub message: String,
}

/// Result alias for CLI command execution.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// A validation failure (exit code 1).
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::ValidationFailure,
            message: message.into(),
        }
    }

    /// An I/O failure (exit code 2).
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::IoError,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// One board's entry in the JSON run report.
#[derive(Serialize, Debug)]
pub struct BoardReport {
    /// Board id from the inventory.
    pub id: String,
    /// `ok`, `warnings`, or `failed`.
    pub status: String,
    /// Warnings accumulated while compiling the board.
    pub warnings: Vec<String>,
    /// The error that aborted the board, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON-serializable run report for `--json` output.
#[derive(Serialize, Debug)]
pub struct RunResponse {
    /// Per-board results in inventory order.
    pub boards: Vec<BoardReport>,
    /// True when every selected board succeeded.
    pub success: bool,
}

impl RunResponse {
    /// Builds the response from a run report.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            boards: report
                .outcomes
                .iter()
                .map(|outcome| BoardReport {
                    id: outcome.id.clone(),
                    status: outcome.status().to_string(),
                    warnings: outcome.warnings.clone(),
                    error: outcome.error.as_ref().map(ToString::to_string),
                })
                .collect(),
            success: report.all_succeeded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::runner::BoardOutcome;

    fn outcome(id: &str, warnings: Vec<String>, error: Option<CompileError>) -> BoardOutcome {
        BoardOutcome {
            id: id.to_string(),
            name: id.to_uppercase(),
            files: Vec::new(),
            warnings,
            error,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(CliError::validation("x").exit_code.code(), 1);
        assert_eq!(CliError::io("x").exit_code.code(), 2);
    }

    #[test]
    fn test_run_response_statuses() {
        let report = RunReport {
            outcomes: vec![
                outcome("a", Vec::new(), None),
                outcome("b", vec!["w".to_string()], None),
                outcome("c", Vec::new(), Some(CompileError::config("bad"))),
            ],
        };

        let response = RunResponse::from_report(&report);
        assert!(!response.success);
        assert_eq!(response.boards[0].status, "ok");
        assert_eq!(response.boards[1].status, "warnings");
        assert_eq!(response.boards[2].status, "failed");
        assert!(response.boards[2].error.as_deref().unwrap_or("").contains("bad"));

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":false"));
        // Succeeding boards omit the error field entirely.
        assert!(json.contains("{\"id\":\"a\",\"status\":\"ok\",\"warnings\":[]}"));
    }
}
