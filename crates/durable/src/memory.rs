//! In-memory durable runtime for testing and single-process use.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Notify;

use crate::error::{RuntimeError, StepError};
use crate::journal::{Journal, Recorded};
use crate::retry::{Attempt, RetryPolicy};
use crate::runtime::{DurableRuntime, QueryHandler, RuntimeClient};
use crate::step::StepFailure;

/// Journal name used for timer entries.
const TIMER: &str = "timer";

/// In-memory implementation of [`DurableRuntime`] and [`RuntimeClient`].
///
/// One instance drives one workflow run. Constructing a second instance
/// over the same [`Journal`] simulates resumption after a crash: every
/// suspension point whose outcome was recorded replays from the journal
/// instead of re-dispatching.
#[derive(Default)]
pub struct InMemoryRuntime {
    journal: Journal,
    cursor: AtomicUsize,
    signals: Mutex<HashMap<String, Arc<Notify>>>,
    queries: RwLock<HashMap<String, QueryHandler>>,
    visibility: RwLock<HashMap<String, String>>,
}

impl InMemoryRuntime {
    /// Creates a runtime with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime that resumes from an existing journal.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Returns a handle to this run's journal.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Consumes the next journal entry if this run is still replaying.
    ///
    /// Fails if the requested suspension point does not match what the
    /// journal recorded at this position.
    fn next_recorded(&self, name: &str) -> Result<Option<Recorded>, RuntimeError> {
        let index = self.cursor.load(Ordering::SeqCst);
        match self.journal.entry_at(index) {
            Some(entry) => {
                if entry.name != name {
                    return Err(RuntimeError::NonDeterminism {
                        expected: entry.name,
                        actual: name.to_string(),
                    });
                }
                self.cursor.fetch_add(1, Ordering::SeqCst);
                Ok(Some(entry.outcome))
            }
            None => Ok(None),
        }
    }

    fn record(&self, name: &str, outcome: Recorded) {
        self.journal.append(name, outcome);
        self.cursor.fetch_add(1, Ordering::SeqCst);
    }

    fn signal_handle(&self, name: &str) -> Arc<Notify> {
        self.signals
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn kind_mismatch(recorded: &Recorded, actual: &str) -> RuntimeError {
        RuntimeError::NonDeterminism {
            expected: recorded_kind(recorded).to_string(),
            actual: actual.to_string(),
        }
    }
}

fn recorded_kind(recorded: &Recorded) -> &'static str {
    match recorded {
        Recorded::Completed(_) => "step completion",
        Recorded::Failed { .. } => "step failure",
        Recorded::Value(_) => "recorded value",
        Recorded::TimerFired => "timer",
        Recorded::WaitStarted { .. } => "wait start",
        Recorded::Signal { .. } => "signal",
    }
}

#[async_trait]
impl DurableRuntime for InMemoryRuntime {
    async fn execute_step<T, F, Fut>(
        &self,
        name: &str,
        policy: &RetryPolicy,
        mut step: F,
    ) -> std::result::Result<T, StepError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut(Attempt) -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, StepFailure>> + Send,
    {
        if let Some(recorded) = self.next_recorded(name)? {
            return match recorded {
                Recorded::Completed(value) => {
                    tracing::debug!(step = name, "replaying recorded step result");
                    Ok(serde_json::from_value(value).map_err(RuntimeError::from)?)
                }
                Recorded::Failed { message, attempts } => Err(match attempts {
                    Some(attempts) => StepError::RetriesExhausted {
                        step: name.to_string(),
                        attempts,
                        message,
                    },
                    None => StepError::Failed {
                        step: name.to_string(),
                        message,
                    },
                }),
                other => Err(Self::kind_mismatch(&other, name).into()),
            };
        }

        let mut attempt = 1u32;
        loop {
            let outcome = match tokio::time::timeout(
                policy.start_to_close,
                step(Attempt::new(attempt)),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(StepFailure::retryable(format!(
                    "attempt {attempt} exceeded start-to-close timeout"
                ))),
            };

            match outcome {
                Ok(value) => {
                    let recorded = serde_json::to_value(&value).map_err(RuntimeError::from)?;
                    self.record(name, Recorded::Completed(recorded));
                    return Ok(value);
                }
                Err(failure) if failure.is_retryable() && !policy.is_final_attempt(attempt) => {
                    let delay = policy.backoff_delay(attempt);
                    tracing::debug!(
                        step = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "retryable step failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) if failure.is_retryable() => {
                    self.record(
                        name,
                        Recorded::Failed {
                            message: failure.message().to_string(),
                            attempts: Some(attempt),
                        },
                    );
                    return Err(StepError::RetriesExhausted {
                        step: name.to_string(),
                        attempts: attempt,
                        message: failure.message().to_string(),
                    });
                }
                Err(failure) => {
                    self.record(
                        name,
                        Recorded::Failed {
                            message: failure.message().to_string(),
                            attempts: None,
                        },
                    );
                    return Err(StepError::Failed {
                        step: name.to_string(),
                        message: failure.message().to_string(),
                    });
                }
            }
        }
    }

    async fn record_once<T, F>(&self, key: &str, generate: F) -> Result<T, RuntimeError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> T + Send,
    {
        if let Some(recorded) = self.next_recorded(key)? {
            return match recorded {
                Recorded::Value(value) => Ok(serde_json::from_value(value)?),
                other => Err(Self::kind_mismatch(&other, key)),
            };
        }
        let value = generate();
        self.record(key, Recorded::Value(serde_json::to_value(&value)?));
        Ok(value)
    }

    async fn sleep(&self, duration: Duration) -> Result<(), RuntimeError> {
        if let Some(recorded) = self.next_recorded(TIMER)? {
            return match recorded {
                Recorded::TimerFired => Ok(()),
                other => Err(Self::kind_mismatch(&other, TIMER)),
            };
        }
        tokio::time::sleep(duration).await;
        self.record(TIMER, Recorded::TimerFired);
        Ok(())
    }

    async fn wait_for_signal(&self, name: &str, timeout: Duration) -> Result<bool, RuntimeError> {
        // A wait journals two entries: its start (pinning the timeout
        // window) and its resolution. A run that crashed mid-wait resumes
        // with only the remainder of the window left.
        let remaining = match self.next_recorded(name)? {
            Some(Recorded::WaitStarted { started_at }) => match self.next_recorded(name)? {
                Some(Recorded::Signal { received }) => return Ok(received),
                Some(other) => return Err(Self::kind_mismatch(&other, name)),
                None => {
                    let elapsed = chrono::Utc::now()
                        .signed_duration_since(started_at)
                        .to_std()
                        .unwrap_or_default();
                    timeout.saturating_sub(elapsed)
                }
            },
            Some(other) => return Err(Self::kind_mismatch(&other, name)),
            None => {
                self.record(
                    name,
                    Recorded::WaitStarted {
                        started_at: chrono::Utc::now(),
                    },
                );
                timeout
            }
        };

        let notify = self.signal_handle(name);
        let received = tokio::time::timeout(remaining, notify.notified())
            .await
            .is_ok();
        self.record(name, Recorded::Signal { received });
        Ok(received)
    }

    fn register_query_handler(&self, name: &str, handler: QueryHandler) {
        self.queries
            .write()
            .unwrap()
            .insert(name.to_string(), handler);
    }

    fn set_visibility_attribute(&self, key: &str, value: &str) {
        self.visibility
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl RuntimeClient for InMemoryRuntime {
    fn signal(&self, name: &str) {
        // notify_one stores a permit, so a signal sent before the workflow
        // reaches its wait still satisfies the wait
        self.signal_handle(name).notify_one();
    }

    fn query(&self, name: &str) -> Option<serde_json::Value> {
        self.queries.read().unwrap().get(name).map(|handler| handler())
    }

    fn visibility_attribute(&self, key: &str) -> Option<String> {
        self.visibility.read().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counting_step(
        calls: Arc<AtomicU32>,
        fail_first: u32,
    ) -> impl FnMut(Attempt) -> std::pin::Pin<Box<dyn Future<Output = Result<String, StepFailure>> + Send>>
    {
        move |attempt: Attempt| {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= fail_first {
                    Err(StepFailure::retryable(format!(
                        "unavailable on attempt {attempt}"
                    )))
                } else {
                    Ok("done".to_string())
                }
            })
        }
    }

    #[tokio::test]
    async fn test_step_success_is_journaled() {
        let runtime = InMemoryRuntime::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result: String = runtime
            .execute_step("work", &RetryPolicy::default(), counting_step(calls.clone(), 0))
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.journal().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_is_retried_until_success() {
        let runtime = InMemoryRuntime::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result: String = runtime
            .execute_step("work", &RetryPolicy::default(), counting_step(calls.clone(), 2))
            .await
            .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_runs_once() {
        let runtime = InMemoryRuntime::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<String, StepError> = runtime
            .execute_step("work", &RetryPolicy::default(), move |_attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StepFailure::non_retryable("invalid account"))
                }
            })
            .await;

        assert!(matches!(result, Err(StepError::Failed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion() {
        let runtime = InMemoryRuntime::new();
        let policy = RetryPolicy::default().with_maximum_attempts(3);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<String, StepError> = runtime
            .execute_step("work", &policy, counting_step(calls.clone(), u32::MAX))
            .await;

        match result {
            Err(StepError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_to_close_timeout_counts_as_retryable() {
        let runtime = InMemoryRuntime::new();
        let policy = RetryPolicy::default().with_maximum_attempts(2);

        let result: Result<String, StepError> = runtime
            .execute_step("slow", &policy, |_attempt| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("too late".to_string())
            })
            .await;

        match result {
            Err(StepError::RetriesExhausted { attempts, message, .. }) => {
                assert_eq!(attempts, 2);
                assert!(message.contains("start-to-close"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_replay_does_not_redispatch_completed_step() {
        let journal = Journal::new();
        let calls = Arc::new(AtomicU32::new(0));

        let first = InMemoryRuntime::with_journal(journal.clone());
        let value: String = first
            .execute_step("work", &RetryPolicy::default(), counting_step(calls.clone(), 0))
            .await
            .unwrap();

        let resumed = InMemoryRuntime::with_journal(journal);
        let replayed: String = resumed
            .execute_step("work", &RetryPolicy::default(), counting_step(calls.clone(), 0))
            .await
            .unwrap();

        assert_eq!(value, replayed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replay_reproduces_recorded_failure() {
        let journal = Journal::new();
        let first = InMemoryRuntime::with_journal(journal.clone());

        let result: Result<String, StepError> = first
            .execute_step("work", &RetryPolicy::default(), |_attempt| async {
                Err(StepFailure::non_retryable("invalid account"))
            })
            .await;
        assert!(result.is_err());

        let resumed = InMemoryRuntime::with_journal(journal);
        let replayed: Result<String, StepError> = resumed
            .execute_step("work", &RetryPolicy::default(), |_attempt| async {
                panic!("must not be dispatched on replay")
            })
            .await;

        match replayed {
            Err(StepError::Failed { message, .. }) => assert_eq!(message, "invalid account"),
            other => panic!("expected recorded failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_once_is_stable_across_replay() {
        let journal = Journal::new();

        let first = InMemoryRuntime::with_journal(journal.clone());
        let original: String = first
            .record_once("token", || "generated-once".to_string())
            .await
            .unwrap();

        let resumed = InMemoryRuntime::with_journal(journal);
        let replayed: String = resumed
            .record_once("token", || "generated-again".to_string())
            .await
            .unwrap();

        assert_eq!(original, replayed);
        assert_eq!(replayed, "generated-once");
    }

    #[tokio::test]
    async fn test_non_determinism_is_detected() {
        let journal = Journal::new();
        let first = InMemoryRuntime::with_journal(journal.clone());
        let _: String = first
            .record_once("token", || "value".to_string())
            .await
            .unwrap();

        let resumed = InMemoryRuntime::with_journal(journal);
        let result: Result<String, RuntimeError> = resumed
            .record_once("different-token", || "value".to_string())
            .await;

        assert!(matches!(result, Err(RuntimeError::NonDeterminism { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_signal_times_out() {
        let runtime = InMemoryRuntime::new();
        let started = tokio::time::Instant::now();

        let received = runtime
            .wait_for_signal("approve", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(!received);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_sent_before_wait_is_buffered() {
        let runtime = InMemoryRuntime::new();
        runtime.signal("approve");

        let received = runtime
            .wait_for_signal("approve", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(received);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_outcome_is_replayed() {
        let journal = Journal::new();
        let first = InMemoryRuntime::with_journal(journal.clone());
        first.signal("approve");
        assert!(first
            .wait_for_signal("approve", Duration::from_secs(30))
            .await
            .unwrap());

        // no signal sent on the resumed run; outcome comes from the journal
        let resumed = InMemoryRuntime::with_journal(journal);
        let started = tokio::time::Instant::now();
        assert!(resumed
            .wait_for_signal("approve", Duration::from_secs(30))
            .await
            .unwrap());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_wait_covers_only_the_remainder() {
        let journal = Journal::new();
        let first = InMemoryRuntime::with_journal(journal.clone());

        // run dies mid-wait; the start of the window is already journaled
        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            first.wait_for_signal("approve", Duration::from_secs(30)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(journal.len(), 1);

        let resumed = InMemoryRuntime::with_journal(journal);
        let started = tokio::time::Instant::now();
        let received = resumed
            .wait_for_signal("approve", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(!received);
        // wall time already spent waiting is subtracted from the window
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(started.elapsed() >= Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_replayed_without_waiting() {
        let journal = Journal::new();
        let first = InMemoryRuntime::with_journal(journal.clone());
        first.sleep(Duration::from_secs(10)).await.unwrap();

        let resumed = InMemoryRuntime::with_journal(journal);
        let started = tokio::time::Instant::now();
        resumed.sleep(Duration::from_secs(10)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_query_handler_registration() {
        let runtime = InMemoryRuntime::new();
        runtime.register_query_handler(
            "status",
            Box::new(|| serde_json::json!({ "progress": 50 })),
        );

        let value = runtime.query("status").unwrap();
        assert_eq!(value["progress"], 50);
        assert!(runtime.query("unknown").is_none());
    }

    #[tokio::test]
    async fn test_visibility_attributes() {
        let runtime = InMemoryRuntime::new();
        assert!(runtime.visibility_attribute("Step").is_none());

        runtime.set_visibility_attribute("Step", "withdraw");
        assert_eq!(runtime.visibility_attribute("Step").as_deref(), Some("withdraw"));

        runtime.set_visibility_attribute("Step", "deposit");
        assert_eq!(runtime.visibility_attribute("Step").as_deref(), Some("deposit"));
    }
}
