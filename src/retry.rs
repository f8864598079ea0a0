//! Backoff policy for rate-limited requests.

use std::time::Duration;

/// Retry policy applied when the API answers 429.
///
/// Only rate-limit responses go through this policy. Other non-2xx statuses
/// are terminal, and transient transport errors are handled by a separate
/// fixed-count retry in the client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Wait durations between attempts; the last entry repeats if there are
    /// more retries than schedule slots.
    pub backoff_schedule: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given max retries and the default
    /// exponential schedule.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disable retries entirely.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Replace the backoff schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: Vec<Duration>) -> Self {
        self.backoff_schedule = schedule;
        self
    }

    /// Delay before the retry following `attempt` (0-based).
    ///
    /// A server-supplied `Retry-After` value always takes precedence over
    /// the schedule.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(mandated) = retry_after {
            return mandated;
        }
        self.backoff_schedule
            .get(attempt as usize)
            .or_else(|| self.backoff_schedule.last())
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}
