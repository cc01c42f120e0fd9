//! Account transfer saga constants.

use std::time::Duration;

/// Step name: validate the transfer request.
pub const STEP_VALIDATE: &str = "validate";

/// Step name: withdraw funds from the source account.
pub const STEP_WITHDRAW: &str = "withdraw";

/// Step name: deposit funds into the destination account.
pub const STEP_DEPOSIT: &str = "deposit";

/// Step name: compensate a committed withdrawal.
pub const STEP_UNDO_WITHDRAW: &str = "undo_withdraw";

/// Step name: send the post-transfer notification.
pub const STEP_SEND_NOTIFICATION: &str = "send_notification";

/// Signal that releases the human-approval gate.
pub const SIGNAL_APPROVE: &str = "approve_transfer";

/// Query name under which the transfer status is readable.
pub const QUERY_STATUS: &str = "transfer_status";

/// Record-once key for the per-transfer idempotency key.
pub const RECORD_IDEMPOTENCY_KEY: &str = "idempotency_key";

/// Record-once key for the transfer's completion timestamp.
pub const RECORD_COMPLETED_AT: &str = "completed_at";

/// Visibility attribute key carrying the current step name.
pub const VISIBILITY_STEP_KEY: &str = "Step";

/// How long the approval gate waits for a signal before failing the transfer.
pub const APPROVAL_TIMEOUT: Duration = Duration::from_secs(30);
