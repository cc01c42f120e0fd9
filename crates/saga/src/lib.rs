//! Money transfer saga.
//!
//! Coordinates a multi-step account transfer (validate → withdraw →
//! deposit → send notification) as a single durable, resumable
//! transaction on top of the `durable` runtime:
//!
//! - every step is dispatched through the runtime's retrying,
//!   at-least-once dispatcher, so money-moving steps carry an
//!   idempotency key generated exactly once per transfer;
//! - a non-retryable (or retry-exhausted) deposit failure triggers a
//!   single compensating `undo_withdraw`;
//! - live progress is projected through a status snapshot readable at
//!   any time, including while the transfer is suspended;
//! - an optional human-approval gate bounds the transfer on a signal
//!   wait with a fixed timeout.

pub mod account_transfer;
pub mod error;
pub mod gate;
pub mod handle;
pub mod model;
pub mod orchestrator;
pub mod services;
pub mod status;
pub mod steps;

pub use error::TransferError;
pub use gate::ApprovalGate;
pub use handle::{TransferHandle, start_transfer};
pub use model::{DepositReceipt, IdempotencyKey, TransferOutcome, TransferRequest};
pub use orchestrator::{TransferConfig, TransferOrchestrator};
pub use services::{
    BankError, BankService, InMemoryBank, InMemoryNotifier, NotificationError,
    NotificationService,
};
pub use status::{Phase, StatusProjector, StatusReader, TransferStatus};
