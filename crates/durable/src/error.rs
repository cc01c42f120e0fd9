//! Runtime and step error types.

use thiserror::Error;

/// Errors raised by the durable runtime itself, as opposed to failures
/// of the dispatched step.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A replayed run diverged from the recorded journal.
    #[error("non-deterministic replay: journal recorded '{expected}', workflow requested '{actual}'")]
    NonDeterminism { expected: String, actual: String },

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Terminal outcome of a step dispatch.
///
/// A step that succeeds returns its value; everything else surfaces here,
/// with enough structure for the caller to tell a non-retryable rejection
/// apart from retry-policy exhaustion.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step failed with a non-retryable error.
    #[error("step '{step}' failed: {message}")]
    Failed { step: String, message: String },

    /// The step kept failing with retryable errors until the policy's
    /// attempt limit was reached.
    #[error("step '{step}' exhausted {attempts} attempts: {message}")]
    RetriesExhausted {
        step: String,
        attempts: u32,
        message: String,
    },

    /// The runtime itself failed while dispatching the step.
    #[error("runtime error in step dispatch: {0}")]
    Runtime(#[from] RuntimeError),
}

impl StepError {
    /// Returns the underlying failure message, without the step prefix.
    pub fn reason(&self) -> String {
        match self {
            StepError::Failed { message, .. } => message.clone(),
            StepError::RetriesExhausted { message, .. } => message.clone(),
            StepError::Runtime(err) => err.to_string(),
        }
    }

    /// Returns the number of attempts made, if the step exhausted its policy.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            StepError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
