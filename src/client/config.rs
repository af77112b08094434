//! Configuration for client queries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_serde;

/// Caching and retry policy for client queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Age after which cached data is refetched on next use.
    #[serde(with = "duration_serde")]
    pub stale_time: Duration,
    /// Idle time after which an entry is evicted.
    #[serde(with = "duration_serde")]
    pub gc_time: Duration,
    /// Retries after the first failed attempt.
    pub retry: u32,
    /// Delay before the first retry; doubled on each further retry.
    #[serde(with = "duration_serde")]
    pub retry_base_delay: Duration,
    /// Upper bound on the retry delay.
    #[serde(with = "duration_serde")]
    pub max_retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            retry: 3,
            retry_base_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl QueryConfig {
    /// Set the retry count.
    #[must_use]
    pub const fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Set the base retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}
