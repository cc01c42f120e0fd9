//! Transfer error taxonomy.

use thiserror::Error;

use crate::account_transfer;

/// Terminal errors a transfer can end with.
///
/// Every variant names the step that produced it; the deposit variants
/// distinguish a non-retryable business rejection from retry-policy
/// exhaustion, both of which trigger compensation before surfacing.
/// A failed compensation is logged by the orchestrator but never
/// replaces the originating error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The request failed validation; nothing was committed.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// No approval signal arrived within the gate's timeout window.
    #[error("approval not received within {timeout_secs} seconds")]
    ApprovalTimeout { timeout_secs: u64 },

    /// Withdraw failed terminally; no funds moved, no compensation needed.
    #[error("withdraw failed: {reason}")]
    Withdrawal { reason: String },

    /// Deposit was rejected non-retryably (e.g. invalid destination
    /// account); the withdrawal was compensated.
    #[error("deposit rejected: {reason}")]
    DepositRejected { reason: String },

    /// Deposit kept failing transiently until retries were exhausted;
    /// the withdrawal was compensated.
    #[error("deposit failed after {attempts} attempts: {reason}")]
    DepositFailed { reason: String, attempts: u32 },

    /// Notification failed after the funds already moved; nothing is
    /// compensated.
    #[error("notification failed: {reason}")]
    Notification { reason: String },

    /// Cancellation was requested; the saga stopped before dispatching
    /// the named step.
    #[error("transfer cancelled before step '{step}'")]
    Cancelled { step: String },

    /// The durable runtime itself failed.
    #[error("runtime error: {reason}")]
    Runtime { reason: String },
}

impl TransferError {
    /// The step (or gate) this error is attributed to.
    pub fn failed_step(&self) -> &str {
        match self {
            TransferError::Validation { .. } => account_transfer::STEP_VALIDATE,
            TransferError::ApprovalTimeout { .. } => "approval_gate",
            TransferError::Withdrawal { .. } => account_transfer::STEP_WITHDRAW,
            TransferError::DepositRejected { .. } | TransferError::DepositFailed { .. } => {
                account_transfer::STEP_DEPOSIT
            }
            TransferError::Notification { .. } => account_transfer::STEP_SEND_NOTIFICATION,
            TransferError::Cancelled { step } => step,
            TransferError::Runtime { .. } => "runtime",
        }
    }
}

/// Convenience type alias for transfer results.
pub type Result<T> = std::result::Result<T, TransferError>;
