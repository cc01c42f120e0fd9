//! Step executors.
//!
//! Each executor is a thin function over its external service that owns
//! the classification of failures as retryable or not; the orchestrator
//! never guesses a classification.

use durable::{Attempt, StepFailure};

use crate::model::{DepositReceipt, IdempotencyKey, TransferRequest};
use crate::services::{BankError, BankService, NotificationService};

/// Inspects the request. No side effects; any failure is non-retryable
/// since malformed input does not become valid on retry.
pub async fn validate(request: &TransferRequest, _attempt: Attempt) -> Result<(), StepFailure> {
    if !request.amount.is_positive() {
        return Err(StepFailure::non_retryable(format!(
            "amount must be positive, got {}",
            request.amount.cents()
        )));
    }
    if request.from_account.is_empty() {
        return Err(StepFailure::non_retryable("source account is empty"));
    }
    if request.to_account.is_empty() {
        return Err(StepFailure::non_retryable("destination account is empty"));
    }
    if request.from_account == request.to_account {
        return Err(StepFailure::non_retryable(
            "source and destination accounts are the same",
        ));
    }
    Ok(())
}

/// Withdraws from the source account. Upstream unavailability is
/// retryable; everything else is not.
pub async fn withdraw<B: BankService>(
    bank: &B,
    key: &IdempotencyKey,
    request: &TransferRequest,
    attempt: Attempt,
) -> Result<(), StepFailure> {
    tracing::debug!(%key, attempt = attempt.number(), "withdrawing money");
    bank.withdraw(key, &request.from_account, request.amount)
        .await
        .map_err(classify_money_movement)
}

/// Deposits into the destination account. An invalid destination is a
/// non-retryable business failure (and triggers compensation upstream);
/// anything else is retried until policy exhaustion.
pub async fn deposit<B: BankService>(
    bank: &B,
    key: &IdempotencyKey,
    request: &TransferRequest,
    attempt: Attempt,
) -> Result<DepositReceipt, StepFailure> {
    tracing::debug!(%key, attempt = attempt.number(), "depositing money");
    bank.deposit(key, &request.to_account, request.amount)
        .await
        .map_err(classify_money_movement)
}

/// Compensating action for a committed withdrawal. Best-effort: its own
/// failures are never retried at the saga level, so everything is
/// reported non-retryable.
pub async fn undo_withdraw<B: BankService>(
    bank: &B,
    key: &IdempotencyKey,
    request: &TransferRequest,
    _attempt: Attempt,
) -> Result<(), StepFailure> {
    bank.undo_withdraw(key, &request.from_account, request.amount)
        .await
        .map_err(|err| StepFailure::non_retryable(err.to_string()))
}

/// Sends the post-transfer notification. Failures are treated as
/// transient delivery problems and retried per policy.
pub async fn send_notification<N: NotificationService>(
    notifier: &N,
    request: &TransferRequest,
    attempt: Attempt,
) -> Result<(), StepFailure> {
    tracing::debug!(attempt = attempt.number(), "sending notification");
    notifier
        .send(request)
        .await
        .map_err(|err| StepFailure::retryable(err.to_string()))
}

fn classify_money_movement(err: BankError) -> StepFailure {
    match err {
        BankError::Unavailable { .. } => StepFailure::retryable(err.to_string()),
        BankError::InvalidAccount { .. } => StepFailure::non_retryable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryBank;
    use common::Money;

    fn request() -> TransferRequest {
        TransferRequest::new(Money::from_cents(100), "A", "B")
    }

    #[tokio::test]
    async fn test_validate_accepts_well_formed_request() {
        assert!(validate(&request(), Attempt::first()).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejections_are_non_retryable() {
        let zero = TransferRequest::new(Money::zero(), "A", "B");
        let failure = validate(&zero, Attempt::first()).await.unwrap_err();
        assert!(!failure.is_retryable());

        let self_transfer = TransferRequest::new(Money::from_cents(100), "A", "A");
        let failure = validate(&self_transfer, Attempt::first()).await.unwrap_err();
        assert!(!failure.is_retryable());

        let no_source = TransferRequest::new(Money::from_cents(100), "", "B");
        assert!(validate(&no_source, Attempt::first()).await.is_err());
    }

    #[tokio::test]
    async fn test_withdraw_classifies_downtime_as_retryable() {
        let bank = InMemoryBank::new();
        bank.set_unavailable_withdraw_calls(1);

        let failure = withdraw(&bank, &IdempotencyKey::generate(), &request(), Attempt::first())
            .await
            .unwrap_err();
        assert!(failure.is_retryable());
    }

    #[tokio::test]
    async fn test_deposit_classifies_invalid_account_as_non_retryable() {
        let bank = InMemoryBank::new();
        bank.set_invalid_destination(true);

        let failure = deposit(&bank, &IdempotencyKey::generate(), &request(), Attempt::first())
            .await
            .unwrap_err();
        assert!(!failure.is_retryable());
    }

    #[tokio::test]
    async fn test_undo_withdraw_failure_is_non_retryable() {
        let bank = InMemoryBank::new();
        bank.set_fail_undo(true);

        let failure = undo_withdraw(&bank, &IdempotencyKey::generate(), &request(), Attempt::first())
            .await
            .unwrap_err();
        assert!(!failure.is_retryable());
    }
}
