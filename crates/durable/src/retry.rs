//! Retry policy with exponential backoff.

use std::time::Duration;

/// Retry policy applied to every step dispatched through the runtime.
///
/// Backoff grows exponentially from `initial_interval` by
/// `backoff_coefficient` per failed attempt, capped at `maximum_interval`.
/// Each individual attempt is bounded by `start_to_close`; an attempt that
/// exceeds it counts as a retryable failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    pub start_to_close: Duration,
    /// Attempt limit; `None` retries until the step succeeds or fails
    /// non-retryably.
    pub maximum_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(30),
            start_to_close: Duration::from_secs(5),
            maximum_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Returns a copy of this policy with an attempt limit.
    pub fn with_maximum_attempts(mut self, attempts: u32) -> Self {
        self.maximum_attempts = Some(attempts);
        self
    }

    /// Backoff delay after the given failed attempt (1-based).
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let factor = self.backoff_coefficient.powi(failed_attempt.saturating_sub(1) as i32);
        let delay = self.initial_interval.mul_f64(factor);
        delay.min(self.maximum_interval)
    }

    /// Returns true if the given attempt number is the last one allowed.
    pub fn is_final_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts.is_some_and(|max| attempt >= max)
    }
}

/// The current attempt number of a step invocation (1-based).
///
/// Handed to the step executor so it can factor retry progress into its
/// own behavior, mirroring what the retrying dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(u32);

impl Attempt {
    /// The first attempt.
    pub fn first() -> Self {
        Self(1)
    }

    /// Creates an attempt with an explicit number.
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the 1-based attempt number.
    pub fn number(&self) -> u32 {
        self.0
    }

    /// Returns true for the first attempt.
    pub fn is_first(&self) -> bool {
        self.0 == 1
    }
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
