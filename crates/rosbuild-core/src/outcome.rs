//! Three-valued outcome of a test step.

use serde::{Deserialize, Serialize};

/// Result of a testbuild step after classification.
///
/// WARNINGS deliberately covers "ran but did not clearly pass": an empty
/// test log and a first line without "Passed" both land here, never in
/// FAILURE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Success,
    Warnings,
    Failure,
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestOutcome::Success => write!(f, "success"),
            TestOutcome::Warnings => write!(f, "warnings"),
            TestOutcome::Failure => write!(f, "failure"),
        }
    }
}
