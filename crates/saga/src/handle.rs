//! Caller-facing handle for a spawned transfer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::TransferId;
use durable::{DurableRuntime, RuntimeClient};
use tokio::sync::watch;

use crate::account_transfer::{QUERY_STATUS, SIGNAL_APPROVE};
use crate::error::TransferError;
use crate::model::{TransferOutcome, TransferRequest};
use crate::orchestrator::{TransferConfig, TransferOrchestrator};
use crate::services::{BankService, NotificationService};
use crate::status::{StatusProjector, StatusReader, TransferStatus};

type Outcome = Result<TransferOutcome, TransferError>;

/// Spawns a transfer on the given runtime and returns a handle to it.
///
/// The transfer runs as a background task; the handle exposes its live
/// status, the approval and cancel controls, and the terminal outcome.
pub fn start_transfer<R, B, N>(
    runtime: Arc<R>,
    bank: B,
    notifier: N,
    config: TransferConfig,
    request: TransferRequest,
) -> TransferHandle<R>
where
    R: DurableRuntime + RuntimeClient + 'static,
    B: BankService + 'static,
    N: NotificationService + 'static,
{
    let id = TransferId::new();
    let (projector, reader) = StatusProjector::new();

    // Queries serve the projection even while the transfer is suspended
    let query_reader = reader.clone();
    runtime.register_query_handler(
        QUERY_STATUS,
        Box::new(move || {
            serde_json::to_value(query_reader.snapshot()).unwrap_or_default()
        }),
    );

    let cancelled = Arc::new(AtomicBool::new(false));
    let orchestrator = TransferOrchestrator::new(Arc::clone(&runtime), bank, notifier, config);

    // The task itself publishes the outcome, so abandoning a wait() in
    // flight can never lose it
    let (outcome_tx, outcome_rx) = watch::channel(None);
    {
        let cancelled = Arc::clone(&cancelled);
        tokio::spawn(async move {
            let result = orchestrator.run(request, projector, cancelled).await;
            let _ = outcome_tx.send(Some(result));
        });
    }

    TransferHandle {
        id,
        runtime,
        status: reader,
        cancelled,
        outcome: outcome_rx,
    }
}

/// A live transfer: status, controls, and the eventual outcome.
pub struct TransferHandle<R: RuntimeClient> {
    id: TransferId,
    runtime: Arc<R>,
    status: StatusReader,
    cancelled: Arc<AtomicBool>,
    outcome: watch::Receiver<Option<Outcome>>,
}

impl<R: RuntimeClient> TransferHandle<R> {
    /// The transfer's identifier.
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Snapshot of the current status projection.
    pub fn status(&self) -> TransferStatus {
        self.status.snapshot()
    }

    /// A reader for observing status transitions as they happen.
    pub fn status_reader(&self) -> StatusReader {
        self.status.clone()
    }

    /// The runtime the transfer runs on, for signals and queries.
    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// Delivers the approval signal. Harmless if the transfer is not
    /// gated or already past the gate.
    pub fn approve(&self) {
        self.runtime.signal(SIGNAL_APPROVE);
    }

    /// Requests cancellation; takes effect before the next step dispatch.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Waits for the transfer to reach its terminal outcome.
    ///
    /// Safe to call more than once and safe to abandon mid-wait: the
    /// outcome is published by the transfer task, so every call returns
    /// the same result once it lands.
    pub async fn wait(&self) -> Outcome {
        let mut outcome = self.outcome.clone();
        loop {
            let current = outcome.borrow_and_update().clone();
            if let Some(result) = current {
                return result;
            }
            if outcome.changed().await.is_err() {
                return Err(TransferError::Runtime {
                    reason: "transfer task terminated without an outcome".to_string(),
                });
            }
        }
    }
}
