//! Test-step result classification.

use rosbuild_core::TestOutcome;

/// Classify the outcome of the testbuild step from the command's exit
/// disposition and the captured `tests` log stream.
///
/// A failed command is always FAILURE, regardless of log contents.
/// Otherwise a first log line containing "Passed" is SUCCESS, and
/// anything else, including an empty log, is WARNINGS. Classification is
/// a pure read of already-captured state; there are no retries.
pub fn classify(command_failed: bool, tests_log: &[String]) -> TestOutcome {
    if command_failed {
        return TestOutcome::Failure;
    }
    match tests_log.first() {
        Some(line) if line.contains("Passed") => TestOutcome::Success,
        _ => TestOutcome::Warnings,
    }
}
