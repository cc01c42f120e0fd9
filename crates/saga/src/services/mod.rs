//! External service traits and in-memory implementations for saga steps.

pub mod bank;
pub mod notification;

pub use bank::{BankError, BankService, InMemoryBank};
pub use notification::{InMemoryNotifier, NotificationError, NotificationService};
