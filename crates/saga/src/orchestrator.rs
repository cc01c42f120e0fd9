//! Transfer orchestrator: the saga state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use durable::{DurableRuntime, RetryPolicy, StepError};

use crate::account_transfer::{
    self, STEP_DEPOSIT, STEP_SEND_NOTIFICATION, STEP_UNDO_WITHDRAW, STEP_VALIDATE, STEP_WITHDRAW,
};
use crate::error::TransferError;
use crate::gate::ApprovalGate;
use crate::model::{IdempotencyKey, TransferOutcome, TransferRequest};
use crate::services::{BankService, NotificationService};
use crate::status::{Phase, StatusProjector};
use crate::steps;

/// Capability flags and tuning for one transfer instance.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Gate the transfer on a human approval signal before moving money.
    pub require_approval: bool,
    /// How long the approval gate waits before failing the transfer.
    pub approval_timeout: Duration,
    /// Publish the current step name as a visibility attribute.
    pub advanced_visibility: bool,
    /// Retry policy applied to every step dispatch.
    pub retry_policy: RetryPolicy,
    /// Durable delay inserted before each status transition; zero skips
    /// the sleep entirely.
    pub pacing: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            require_approval: false,
            approval_timeout: account_transfer::APPROVAL_TIMEOUT,
            advanced_visibility: false,
            // the substrate enforces an attempt bound so a dead upstream
            // surfaces as exhaustion instead of retrying forever
            retry_policy: RetryPolicy::default().with_maximum_attempts(10),
            pacing: Duration::ZERO,
        }
    }
}

impl TransferConfig {
    /// Returns a config with the approval gate enabled.
    pub fn with_approval(mut self) -> Self {
        self.require_approval = true;
        self
    }

    /// Returns a config that publishes step names for external search.
    pub fn with_advanced_visibility(mut self) -> Self {
        self.advanced_visibility = true;
        self
    }
}

/// Drives a transfer through its steps in strict program order.
///
/// One orchestrator instance owns one transfer: its status projection,
/// its idempotency key, and the decision between retry, compensation,
/// and abort. Steps run strictly sequentially; suspension (step waits,
/// the approval gate, pacing delays) is cooperative through the runtime.
pub struct TransferOrchestrator<R, B, N>
where
    R: DurableRuntime,
    B: BankService,
    N: NotificationService,
{
    runtime: Arc<R>,
    bank: B,
    notifier: N,
    config: TransferConfig,
}

impl<R, B, N> TransferOrchestrator<R, B, N>
where
    R: DurableRuntime,
    B: BankService,
    N: NotificationService,
{
    /// Creates a new orchestrator.
    pub fn new(runtime: Arc<R>, bank: B, notifier: N, config: TransferConfig) -> Self {
        Self {
            runtime,
            bank,
            notifier,
            config,
        }
    }

    /// Runs the transfer to its terminal outcome, mutating `status` as it
    /// progresses. Already-journaled steps are not re-dispatched, so a
    /// resumed run picks up where the crashed one stopped.
    #[tracing::instrument(
        skip(self, status, cancelled),
        fields(
            amount = request.amount.cents(),
            from = %request.from_account,
            to = %request.to_account,
        )
    )]
    pub async fn run(
        &self,
        request: TransferRequest,
        status: StatusProjector,
        cancelled: Arc<AtomicBool>,
    ) -> Result<TransferOutcome, TransferError> {
        metrics::counter!("transfer_executions_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.drive(&request, &status, &cancelled).await;
        match &result {
            Ok(outcome) => {
                metrics::counter!("transfer_completed").increment(1);
                tracing::info!(deposit_id = %outcome.deposit.deposit_id, "transfer finished");
            }
            Err(err) => {
                status.fail();
                metrics::counter!("transfer_failed").increment(1);
                tracing::warn!(step = err.failed_step(), error = %err, "transfer failed");
            }
        }
        metrics::histogram!("transfer_duration_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    async fn drive(
        &self,
        request: &TransferRequest,
        status: &StatusProjector,
        cancelled: &AtomicBool,
    ) -> Result<TransferOutcome, TransferError> {
        let runtime = self.runtime.as_ref();
        let policy = &self.config.retry_policy;

        // 1. Validate: fatal on failure, nothing committed yet
        self.check_cancelled(cancelled, STEP_VALIDATE)?;
        self.publish_step(STEP_VALIDATE);
        runtime
            .execute_step(STEP_VALIDATE, policy, |attempt| {
                steps::validate(request, attempt)
            })
            .await
            .map_err(|err| TransferError::Validation {
                reason: err.reason(),
            })?;
        self.pace(status, 25, Phase::Running).await?;

        // 2. Optional human-in-the-loop gate, bounded by the timeout window
        if self.config.require_approval {
            status.set_phase(Phase::Waiting);
            let gate = ApprovalGate::new(self.config.approval_timeout);
            let approved = gate.wait(runtime).await.map_err(runtime_error)?;
            if !approved {
                return Err(TransferError::ApprovalTimeout {
                    timeout_secs: self.config.approval_timeout.as_secs(),
                });
            }
            status.set_phase(Phase::Running);
        }

        // Generated exactly once per transfer; replays reuse the recorded
        // value, so every retry of withdraw and deposit carries the same key
        let key: IdempotencyKey = runtime
            .record_once(account_transfer::RECORD_IDEMPOTENCY_KEY, IdempotencyKey::generate)
            .await
            .map_err(runtime_error)?;

        // 3. Withdraw: retried per policy; exhaustion is fatal without
        // compensation since the withdrawal never committed
        self.check_cancelled(cancelled, STEP_WITHDRAW)?;
        self.publish_step(STEP_WITHDRAW);
        runtime
            .execute_step(STEP_WITHDRAW, policy, |attempt| {
                steps::withdraw(&self.bank, &key, request, attempt)
            })
            .await
            .map_err(|err| TransferError::Withdrawal {
                reason: err.reason(),
            })?;
        self.pace(status, 50, Phase::Running).await?;

        // 4. Deposit with the same key; any terminal failure reverts the
        // withdrawal before surfacing
        self.check_cancelled(cancelled, STEP_DEPOSIT)?;
        self.publish_step(STEP_DEPOSIT);
        let receipt = match runtime
            .execute_step(STEP_DEPOSIT, policy, |attempt| {
                steps::deposit(&self.bank, &key, request, attempt)
            })
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.compensate_withdraw(request, &key, err).await),
        };
        self.pace(status, 75, Phase::Deposited).await?;
        status.record_deposit(receipt.clone());

        // 5. Notification: informational; failure is fatal but nothing is
        // compensated, the funds already moved
        self.check_cancelled(cancelled, STEP_SEND_NOTIFICATION)?;
        self.publish_step(STEP_SEND_NOTIFICATION);
        runtime
            .execute_step(STEP_SEND_NOTIFICATION, policy, |attempt| {
                steps::send_notification(&self.notifier, request, attempt)
            })
            .await
            .map_err(|err| TransferError::Notification {
                reason: err.reason(),
            })?;
        self.pace(status, 100, Phase::Finished).await?;

        // journaled so a replayed run reports the same completion time
        let completed_at: DateTime<Utc> = runtime
            .record_once(account_transfer::RECORD_COMPLETED_AT, Utc::now)
            .await
            .map_err(runtime_error)?;

        Ok(TransferOutcome {
            deposit: receipt,
            completed_at,
        })
    }

    /// Reverts the withdrawal after a terminal deposit failure.
    ///
    /// Compensation runs at most once and is best-effort: its own failure
    /// is logged but the deposit failure stays authoritative.
    async fn compensate_withdraw(
        &self,
        request: &TransferRequest,
        key: &IdempotencyKey,
        deposit_err: StepError,
    ) -> TransferError {
        metrics::counter!("transfer_compensations_total").increment(1);
        tracing::warn!(error = %deposit_err, "deposit failed unrecoverably, reverting withdraw");

        let undone = self
            .runtime
            .execute_step(STEP_UNDO_WITHDRAW, &self.config.retry_policy, |attempt| {
                steps::undo_withdraw(&self.bank, key, request, attempt)
            })
            .await;
        if let Err(undo_err) = undone {
            tracing::warn!(error = %undo_err, "compensation failed; keeping original deposit error");
        }

        match deposit_err {
            StepError::RetriesExhausted {
                attempts, message, ..
            } => TransferError::DepositFailed {
                reason: message,
                attempts,
            },
            other => TransferError::DepositRejected {
                reason: other.reason(),
            },
        }
    }

    /// Optional pacing delay, then a progress checkpoint.
    async fn pace(
        &self,
        status: &StatusProjector,
        progress: u8,
        phase: Phase,
    ) -> Result<(), TransferError> {
        if !self.config.pacing.is_zero() {
            self.runtime
                .sleep(self.config.pacing)
                .await
                .map_err(runtime_error)?;
        }
        status.advance(progress, phase);
        Ok(())
    }

    fn publish_step(&self, step: &str) {
        if self.config.advanced_visibility {
            self.runtime
                .set_visibility_attribute(account_transfer::VISIBILITY_STEP_KEY, step);
        }
    }

    fn check_cancelled(&self, cancelled: &AtomicBool, step: &str) -> Result<(), TransferError> {
        if cancelled.load(Ordering::SeqCst) {
            tracing::info!(step, "cancellation requested, stopping before next step");
            return Err(TransferError::Cancelled {
                step: step.to_string(),
            });
        }
        Ok(())
    }
}

fn runtime_error(err: durable::RuntimeError) -> TransferError {
    TransferError::Runtime {
        reason: err.to_string(),
    }
}
