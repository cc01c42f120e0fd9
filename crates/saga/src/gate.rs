//! Human-approval gate.

use std::time::Duration;

use durable::{DurableRuntime, RuntimeError};

use crate::account_transfer;

/// Bounded wait for an external approval signal.
///
/// The wait is a durable suspension point: elapsed wait time survives a
/// crash because the runtime journals the outcome, not this gate.
pub struct ApprovalGate {
    timeout: Duration,
}

impl ApprovalGate {
    /// Creates a gate with the given timeout window.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Suspends until the approval signal arrives or the window elapses.
    /// Returns whether the transfer was approved in time.
    pub async fn wait<R: DurableRuntime>(&self, runtime: &R) -> Result<bool, RuntimeError> {
        tracing::info!(
            timeout_secs = self.timeout.as_secs(),
            "waiting for approval signal"
        );
        runtime
            .wait_for_signal(account_transfer::SIGNAL_APPROVE, self.timeout)
            .await
    }
}
