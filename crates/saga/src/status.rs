//! Live progress projection of a transfer.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::DepositReceipt;

/// The phase of a transfer in its lifecycle.
///
/// Phase transitions:
/// ```text
/// starting ──► running ──┬──► deposited ──► finished
///                 ▲      │
///              waiting   └──► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Transfer accepted, nothing dispatched yet.
    #[default]
    Starting,
    /// Forward steps are executing.
    Running,
    /// Blocked on the human-approval gate.
    Waiting,
    /// The deposit committed; wrap-up steps remain.
    Deposited,
    /// All steps completed (terminal).
    Finished,
    /// The transfer terminated with an error (terminal).
    Failed,
}

impl Phase {
    /// Returns true if no further phase transition may occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finished | Phase::Failed)
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Waiting => "waiting",
            Phase::Deposited => "deposited",
            Phase::Finished => "finished",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of a transfer's progress.
///
/// `progress_percentage` is monotonically non-decreasing and the record
/// never changes again once the phase is terminal. External readers
/// always receive copies, never references into live state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    pub progress_percentage: u8,
    pub phase: Phase,
    /// Set once the deposit succeeds.
    pub deposit: Option<DepositReceipt>,
}

/// Write half of the status projection; owned by the orchestrator,
/// which is the only mutator.
pub struct StatusProjector {
    tx: watch::Sender<TransferStatus>,
}

impl StatusProjector {
    /// Creates a projector and its read half, starting at 0% / starting.
    pub fn new() -> (Self, StatusReader) {
        let (tx, rx) = watch::channel(TransferStatus::default());
        (Self { tx }, StatusReader { rx })
    }

    /// Advances progress and phase. Progress never decreases and a
    /// terminal status is never mutated again.
    pub fn advance(&self, progress: u8, phase: Phase) {
        self.tx.send_modify(|status| {
            if status.phase.is_terminal() {
                return;
            }
            status.progress_percentage = status.progress_percentage.max(progress);
            status.phase = phase;
        });
    }

    /// Sets the phase without touching progress.
    pub fn set_phase(&self, phase: Phase) {
        self.tx.send_modify(|status| {
            if status.phase.is_terminal() {
                return;
            }
            status.phase = phase;
        });
    }

    /// Records the deposit confirmation.
    pub fn record_deposit(&self, receipt: DepositReceipt) {
        self.tx.send_modify(|status| {
            if status.phase.is_terminal() {
                return;
            }
            status.deposit = Some(receipt);
        });
    }

    /// Marks the transfer failed (terminal); progress stays where it was.
    pub fn fail(&self) {
        self.set_phase(Phase::Failed);
    }
}

/// Read half of the status projection; cheap to clone and hand out.
#[derive(Clone)]
pub struct StatusReader {
    rx: watch::Receiver<TransferStatus>,
}

impl StatusReader {
    /// Returns a copy of the last status written by the orchestrator.
    pub fn snapshot(&self) -> TransferStatus {
        self.rx.borrow().clone()
    }

    /// Waits for the next status change and returns it, or `None` once
    /// the transfer is gone and no further change will arrive.
    pub async fn next_change(&mut self) -> Option<TransferStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
