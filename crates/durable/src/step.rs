//! Step failure classification.

use serde::{Deserialize, Serialize};

/// Whether a step failure may be retried.
///
/// Classification is owned by the step executor, never by the caller:
/// only the executor knows whether its upstream condition is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// A transient condition; the dispatcher retries per policy.
    Retryable,
    /// A terminal condition; retrying would not change the outcome.
    NonRetryable,
}

/// A classified failure reported by a step executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    kind: FailureKind,
    message: String,
}

impl StepFailure {
    /// Creates a retryable failure.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Retryable,
            message: message.into(),
        }
    }

    /// Creates a non-retryable failure.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NonRetryable,
            message: message.into(),
        }
    }

    /// Returns true if the dispatcher should retry.
    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Retryable
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
