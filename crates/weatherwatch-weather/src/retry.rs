//! Backoff and retry classification for failed poll cycles.
//!
//! Transient failures (timeouts, connection resets, 5xx, 429) are worth
//! asking again soon. Client errors such as 401 and 404 are not.

use std::time::Duration;

use reqwest::StatusCode;

/// Exponential backoff between attempts after a failure
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay after the first failure (doubles each attempt)
    pub initial_delay: Duration,
    /// Upper bound; the poller uses its regular interval here
    pub max_delay: Duration,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Check if a reqwest error is retryable
pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() {
        return RetryDecision::Retry;
    }

    // Connection reset / refused
    if error.is_connect() {
        return RetryDecision::Retry;
    }

    if error.is_request() {
        return RetryDecision::NoRetry;
    }

    if let Some(status) = error.status() {
        return is_retryable_status(status);
    }

    RetryDecision::NoRetry
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error() {
        return RetryDecision::Retry;
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        return RetryDecision::Retry;
    }

    RetryDecision::NoRetry
}
