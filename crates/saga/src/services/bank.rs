//! Banking service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Money;
use thiserror::Error;

use crate::model::{DepositReceipt, IdempotencyKey};

/// Failures reported by the external banking API.
#[derive(Debug, Clone, Error)]
pub enum BankError {
    /// The account does not exist or cannot receive funds.
    #[error("invalid account: {account}")]
    InvalidAccount { account: String },

    /// The upstream API is temporarily unreachable.
    #[error("bank API unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Trait for the external ledger operations of a transfer.
///
/// Withdraw and deposit must deduplicate on the idempotency key:
/// repeated invocation with the same key has the effect of exactly one
/// invocation, and a repeated deposit returns the receipt minted by the
/// first effect.
#[async_trait]
pub trait BankService: Send + Sync {
    /// Withdraws `amount` from `account`.
    async fn withdraw(
        &self,
        key: &IdempotencyKey,
        account: &str,
        amount: Money,
    ) -> Result<(), BankError>;

    /// Deposits `amount` into `account`, returning a deposit confirmation.
    async fn deposit(
        &self,
        key: &IdempotencyKey,
        account: &str,
        amount: Money,
    ) -> Result<DepositReceipt, BankError>;

    /// Reverts the withdrawal committed under `key`.
    async fn undo_withdraw(
        &self,
        key: &IdempotencyKey,
        account: &str,
        amount: Money,
    ) -> Result<(), BankError>;
}

#[derive(Debug, Default)]
struct InMemoryBankState {
    /// Committed withdrawals, keyed by idempotency key.
    withdrawals: HashMap<String, i64>,
    /// Committed deposits, keyed by idempotency key.
    deposits: HashMap<String, DepositReceipt>,
    next_receipt: u32,
    withdraw_calls: u32,
    deposit_calls: u32,
    undo_calls: u32,
    /// Fail the first N withdraw calls as unavailable.
    unavailable_withdraw_calls: u32,
    /// Fail the first N deposit calls as unavailable.
    unavailable_deposit_calls: u32,
    invalid_destination: bool,
    fail_undo: bool,
}

/// In-memory bank for testing; deduplicates on the idempotency key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    state: Arc<RwLock<InMemoryBankState>>,
}

impl InMemoryBank {
    /// Creates a new in-memory bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates API downtime: the first `calls` withdraw invocations fail.
    pub fn set_unavailable_withdraw_calls(&self, calls: u32) {
        self.state.write().unwrap().unavailable_withdraw_calls = calls;
    }

    /// Simulates API downtime: the first `calls` deposit invocations fail.
    pub fn set_unavailable_deposit_calls(&self, calls: u32) {
        self.state.write().unwrap().unavailable_deposit_calls = calls;
    }

    /// Makes every deposit fail as an invalid destination account.
    pub fn set_invalid_destination(&self, invalid: bool) {
        self.state.write().unwrap().invalid_destination = invalid;
    }

    /// Makes undo_withdraw fail.
    pub fn set_fail_undo(&self, fail: bool) {
        self.state.write().unwrap().fail_undo = fail;
    }

    /// Number of withdrawals currently committed on the ledger.
    pub fn withdraw_effect_count(&self) -> usize {
        self.state.read().unwrap().withdrawals.len()
    }

    /// Number of deposits currently committed on the ledger.
    pub fn deposit_effect_count(&self) -> usize {
        self.state.read().unwrap().deposits.len()
    }

    /// Total withdraw invocations, including deduplicated and failed ones.
    pub fn withdraw_call_count(&self) -> u32 {
        self.state.read().unwrap().withdraw_calls
    }

    /// Total deposit invocations, including deduplicated and failed ones.
    pub fn deposit_call_count(&self) -> u32 {
        self.state.read().unwrap().deposit_calls
    }

    /// Total undo_withdraw invocations.
    pub fn undo_call_count(&self) -> u32 {
        self.state.read().unwrap().undo_calls
    }

    /// Returns the receipt minted for the given key, if a deposit committed.
    pub fn receipt_for(&self, key: &IdempotencyKey) -> Option<DepositReceipt> {
        self.state.read().unwrap().deposits.get(key.as_str()).cloned()
    }
}

#[async_trait]
impl BankService for InMemoryBank {
    async fn withdraw(
        &self,
        key: &IdempotencyKey,
        _account: &str,
        amount: Money,
    ) -> Result<(), BankError> {
        let mut state = self.state.write().unwrap();
        state.withdraw_calls += 1;

        if state.withdraw_calls <= state.unavailable_withdraw_calls {
            return Err(BankError::Unavailable {
                reason: "withdraw API downtime".to_string(),
            });
        }

        // dedup: a repeated key is a no-op
        state
            .withdrawals
            .entry(key.as_str().to_string())
            .or_insert_with(|| amount.cents());
        Ok(())
    }

    async fn deposit(
        &self,
        key: &IdempotencyKey,
        account: &str,
        _amount: Money,
    ) -> Result<DepositReceipt, BankError> {
        let mut state = self.state.write().unwrap();
        state.deposit_calls += 1;

        if state.deposit_calls <= state.unavailable_deposit_calls {
            return Err(BankError::Unavailable {
                reason: "deposit API downtime".to_string(),
            });
        }

        if state.invalid_destination {
            return Err(BankError::InvalidAccount {
                account: account.to_string(),
            });
        }

        if let Some(existing) = state.deposits.get(key.as_str()) {
            return Ok(existing.clone());
        }

        state.next_receipt += 1;
        let receipt = DepositReceipt::new(format!("DEP-{:04}", state.next_receipt));
        state
            .deposits
            .insert(key.as_str().to_string(), receipt.clone());
        Ok(receipt)
    }

    async fn undo_withdraw(
        &self,
        key: &IdempotencyKey,
        _account: &str,
        _amount: Money,
    ) -> Result<(), BankError> {
        let mut state = self.state.write().unwrap();
        state.undo_calls += 1;

        if state.fail_undo {
            return Err(BankError::Unavailable {
                reason: "undo withdraw API downtime".to_string(),
            });
        }

        // only the withdrawal committed under this transfer's key
        state.withdrawals.remove(key.as_str());
        Ok(())
    }
}
