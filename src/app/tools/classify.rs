//! Success/failure classification of a finished tool invocation.
//!
//! A zero exit code is not enough: adb in particular exits 0 while printing
//! `error: no devices/emulators found`. Output is scanned case-insensitively for a
//! fixed set of signatures. Flashing-tool status lines (`OKAY`, `finished`) are often
//! written to stderr on success and match none of them.

use crate::app::models::{CommandResult, FailureKind};
use crate::app::tools::runner::CommandOutput;

pub const ERROR_SIGNATURES: &[&str] = &[
    "error:",
    "no devices/emulators found",
    "permission denied",
    "unauthorized",
];

pub fn matched_signature(stdout: &str, stderr: &str) -> Option<&'static str> {
    let haystack = format!("{stdout}{stderr}").to_lowercase();
    ERROR_SIGNATURES
        .iter()
        .copied()
        .find(|signature| haystack.contains(signature))
}

pub fn classify(output: CommandOutput) -> CommandResult {
    // A signal-terminated child has no code.
    let exit_code = output.exit_code.unwrap_or(-1);
    let failure = if exit_code != 0 {
        Some(FailureKind::NonZeroExit)
    } else if matched_signature(&output.stdout, &output.stderr).is_some() {
        Some(FailureKind::PatternMatched)
    } else {
        None
    };
    CommandResult {
        success: failure.is_none(),
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code,
        failure,
    }
}
