//! Notification service trait and in-memory implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::TransferRequest;

/// Failure reported by the notification channel.
#[derive(Debug, Clone, Error)]
#[error("notification failed: {reason}")]
pub struct NotificationError {
    pub reason: String,
}

/// Trait for the post-transfer notification. Purely informational: the
/// saga never compensates anything on its behalf.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Notifies the parties of a completed transfer.
    async fn send(&self, request: &TransferRequest) -> Result<(), NotificationError>;
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<TransferRequest>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of notifications delivered.
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotifier {
    async fn send(&self, request: &TransferRequest) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError {
                reason: "notification channel unavailable".to_string(),
            });
        }
        self.sent.write().unwrap().push(request.clone());
        Ok(())
    }
}
