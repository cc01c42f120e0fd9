//! Core traits for durable runtime implementations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{RuntimeError, StepError};
use crate::retry::{Attempt, RetryPolicy};
use crate::step::StepFailure;

/// A registered query handler: returns the current value of a workflow
/// projection as JSON, callable at any time (including mid-suspension).
pub type QueryHandler = Box<dyn Fn() -> serde_json::Value + Send + Sync>;

/// The workflow-facing interface of the durable-execution substrate.
///
/// One instance corresponds to one workflow run. All suspension points go
/// through this trait so the substrate can journal their outcomes: a
/// resumed run replays recorded outcomes instead of re-dispatching work
/// that already completed.
#[async_trait]
pub trait DurableRuntime: Send + Sync {
    /// Dispatches a step with at-least-once semantics and automatic retry.
    ///
    /// The step closure receives the current [`Attempt`] number and reports
    /// failures pre-classified as retryable or not. Retryable failures are
    /// retried per `policy` (including the per-attempt start-to-close
    /// ceiling); a non-retryable failure or policy exhaustion terminates
    /// the dispatch. Successful results are journaled, so a replayed run
    /// returns the recorded value without invoking the closure.
    async fn execute_step<T, F, Fut>(
        &self,
        name: &str,
        policy: &RetryPolicy,
        step: F,
    ) -> std::result::Result<T, StepError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut(Attempt) -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, StepFailure>> + Send;

    /// Evaluates a non-deterministic generator exactly once logically.
    ///
    /// The first run invokes `generate` and journals the value; every
    /// replay returns the recorded value instead.
    async fn record_once<T, F>(&self, key: &str, generate: F) -> Result<T, RuntimeError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> T + Send;

    /// Durable cooperative delay; a replayed run returns immediately once
    /// the timer is journaled as fired.
    async fn sleep(&self, duration: Duration) -> Result<(), RuntimeError>;

    /// Suspends until the named signal arrives or `timeout` elapses.
    ///
    /// Returns whether the signal was received within the window. Signals
    /// sent before the wait begins still satisfy it.
    async fn wait_for_signal(&self, name: &str, timeout: Duration) -> Result<bool, RuntimeError>;

    /// Makes a projection readable by name from outside the workflow.
    fn register_query_handler(&self, name: &str, handler: QueryHandler);

    /// Publishes a key/value pair for external indexing and search.
    fn set_visibility_attribute(&self, key: &str, value: &str);
}

/// The caller-facing interface of the substrate: operations available to
/// external observers of a running workflow.
pub trait RuntimeClient: Send + Sync {
    /// Delivers the named signal to the workflow.
    fn signal(&self, name: &str);

    /// Queries a registered handler by name.
    fn query(&self, name: &str) -> Option<serde_json::Value>;

    /// Reads a published visibility attribute.
    fn visibility_attribute(&self, key: &str) -> Option<String>;
}
