//! Durable execution primitives for long-running workflows.
//!
//! This crate defines the interface boundary between a workflow (a saga
//! orchestrating side-effecting steps) and the substrate that makes it
//! crash-safe: retrying step dispatch, record-once evaluation of
//! non-deterministic values, durable timers, signal waits, and by-name
//! queries against a suspended workflow.
//!
//! [`InMemoryRuntime`] implements the interface on top of a replay
//! [`Journal`]: a resumed run replays recorded outcomes instead of
//! re-dispatching steps that already completed.

pub mod error;
pub mod journal;
pub mod memory;
pub mod retry;
pub mod runtime;
pub mod step;

pub use error::{RuntimeError, StepError};
pub use journal::{Journal, JournalEntry, Recorded};
pub use memory::InMemoryRuntime;
pub use retry::{Attempt, RetryPolicy};
pub use runtime::{DurableRuntime, QueryHandler, RuntimeClient};
pub use step::{FailureKind, StepFailure};
