//! Outcome classification for one external invocation.

use serde::Serialize;

/// Text that marks a failed run even when the exit status is 0.
pub const FAILURE_MARKERS: [&str; 4] = [
    "CUDA out of memory",
    "Traceback (most recent call last)",
    "RuntimeError:",
    "Error:",
];

/// Outcome of one external process call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationResult {
    Succeeded,
    Failed {
        /// `None` when the process could not be started or died from a signal.
        exit_code: Option<i32>,
        diagnostic: String,
    },
    Cancelled,
}

impl InvocationResult {
    /// Failure that happened before the process produced any output.
    pub fn failed(message: impl Into<String>) -> Self {
        InvocationResult::Failed {
            exit_code: None,
            diagnostic: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Succeeded)
    }
}

/// Classify a finished process.
///
/// Checked in order: termination request, non-zero exit, failure markers
/// in the combined output. Output of a terminated process is never looked at.
pub fn classify(
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
    terminated: bool,
) -> InvocationResult {
    if terminated {
        return InvocationResult::Cancelled;
    }

    let has_marker = FAILURE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker) || stdout.contains(marker));

    if exit_code != Some(0) || has_marker {
        return InvocationResult::Failed {
            exit_code,
            diagnostic: diagnostic_text(exit_code, stdout, stderr),
        };
    }

    InvocationResult::Succeeded
}

/// Standard error then standard output, or a note when both are empty.
fn diagnostic_text(exit_code: Option<i32>, stdout: &str, stderr: &str) -> String {
    if stdout.trim().is_empty() && stderr.trim().is_empty() {
        let code = exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        return format!("Process failed with no output (exit code {})", code);
    }

    format!(
        "--- STDERR ---\n{}\n\n--- STDOUT ---\n{}",
        stderr.trim_end(),
        stdout.trim_end()
    )
}
