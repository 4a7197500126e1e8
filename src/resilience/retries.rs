//! Retry logic for the session transport.
//!
//! # Responsibilities
//! - Decide whether a response status or transport error is transient
//! - Bound the number of retries
//! - Compute the backoff before the next attempt
//!
//! # Design Decisions
//! - Only a fixed set of statuses is retried (429 and gateway-style 5xx)
//! - Connection and timeout errors are always retryable
//! - Jittered backoff prevents synchronized retries

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct TransientRetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    status_forcelist: Vec<u16>,
}

impl TransientRetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            status_forcelist: config.status_forcelist.clone(),
        }
    }

    /// Whether the status is in the retry list.
    pub fn is_transient_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Whether `retries_done` retries still leave room for another one.
    pub fn has_budget(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Whether to retry after a response with `status`, having already retried `retries_done` times.
    pub fn should_retry_status(&self, status: u16, retries_done: u32) -> bool {
        self.is_transient_status(status) && self.has_budget(retries_done)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base_delay_ms, self.max_delay_ms)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for TransientRetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

/// Whether a reqwest error is worth retrying at the transport level.
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forcelist() {
        let policy = TransientRetryPolicy::default();
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.is_transient_status(status), "{status} should be transient");
        }
        for status in [200, 202, 400, 401, 403, 404, 501] {
            assert!(!policy.is_transient_status(status), "{status} should not be transient");
        }
    }

    #[test]
    fn test_budget_is_bounded() {
        let policy = TransientRetryPolicy::default();
        assert!(policy.should_retry_status(503, 0));
        assert!(policy.should_retry_status(503, 4));
        assert!(!policy.should_retry_status(503, 5));
        assert_eq!(policy.max_retries(), 5);
    }

    #[test]
    fn test_delay_grows() {
        let policy = TransientRetryPolicy::default();
        assert!(policy.delay(2) > policy.delay(1));
    }
}
