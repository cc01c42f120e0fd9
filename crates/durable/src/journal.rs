//! Replay journal for durable runs.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durably recorded outcome of one suspension point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Recorded {
    /// A step completed with the serialized value.
    Completed(serde_json::Value),
    /// A step terminated with a failure. `attempts` is set when the retry
    /// policy was exhausted.
    Failed {
        message: String,
        attempts: Option<u32>,
    },
    /// A record-once value (e.g. a generated idempotency key).
    Value(serde_json::Value),
    /// A durable timer elapsed.
    TimerFired,
    /// A signal wait began; pins the start of its timeout window so a
    /// resumed run waits only the remainder.
    WaitStarted { started_at: DateTime<Utc> },
    /// A signal wait resolved.
    Signal { received: bool },
}

/// One journal entry: the name of the suspension point and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub name: String,
    pub outcome: Recorded,
}

/// Append-only log of suspension-point outcomes for one workflow instance.
///
/// Cloning shares the underlying log, so a second run constructed over the
/// same journal replays what the first run recorded. Entries are replayed
/// strictly in order; the per-run cursor lives in the runtime, not here.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the entry at `index`, if recorded.
    pub fn entry_at(&self, index: usize) -> Option<JournalEntry> {
        self.entries.lock().unwrap().get(index).cloned()
    }

    /// Appends an entry and returns its index.
    pub fn append(&self, name: impl Into<String>, outcome: Recorded) -> usize {
        let mut entries = self.entries.lock().unwrap();
        entries.push(JournalEntry {
            name: name.into(),
            outcome,
        });
        entries.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_back() {
        let journal = Journal::new();
        assert!(journal.is_empty());

        journal.append("withdraw", Recorded::Completed(serde_json::Value::Null));
        journal.append("timer", Recorded::TimerFired);

        assert_eq!(journal.len(), 2);
        let first = journal.entry_at(0).unwrap();
        assert_eq!(first.name, "withdraw");
        assert!(matches!(first.outcome, Recorded::Completed(_)));
        assert!(journal.entry_at(2).is_none());
    }

    #[test]
    fn test_clone_shares_entries() {
        let journal = Journal::new();
        let shared = journal.clone();
        journal.append("validate", Recorded::Completed(serde_json::Value::Null));
        assert_eq!(shared.len(), 1);
    }
}
