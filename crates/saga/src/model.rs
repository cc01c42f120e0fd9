//! Transfer domain types.

use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable input of a transfer: created once at saga start, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Amount in minor currency units; must be strictly positive.
    pub amount: Money,
    pub from_account: String,
    pub to_account: String,
}

impl TransferRequest {
    /// Creates a transfer request.
    pub fn new(amount: Money, from_account: impl Into<String>, to_account: impl Into<String>) -> Self {
        Self {
            amount,
            from_account: from_account.into(),
            to_account: to_account.into(),
        }
    }
}

/// Deduplication token for money-moving steps.
///
/// Generated exactly once per transfer via the runtime's record-once
/// evaluation, then reused verbatim for every retry of withdraw and
/// deposit, so at-least-once dispatch cannot move money twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmation returned by the bank for a committed deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub deposit_id: String,
}

impl DepositReceipt {
    /// Creates a receipt with the given deposit ID.
    pub fn new(deposit_id: impl Into<String>) -> Self {
        Self {
            deposit_id: deposit_id.into(),
        }
    }
}

/// Terminal result of a successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    /// The deposit confirmation carried out of the saga.
    pub deposit: DepositReceipt,
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys_are_unique() {
        assert_ne!(IdempotencyKey::generate(), IdempotencyKey::generate());
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let request = TransferRequest::new(Money::from_cents(100), "A", "B");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount"], 100);
        assert_eq!(json["fromAccount"], "A");
        assert_eq!(json["toAccount"], "B");
    }

    #[test]
    fn test_receipt_roundtrip() {
        let receipt = DepositReceipt::new("DEP-0001");
        let json = serde_json::to_string(&receipt).unwrap();
        assert!(json.contains("depositId"));
        let back: DepositReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, receipt);
    }
}
