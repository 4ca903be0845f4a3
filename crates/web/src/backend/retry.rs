//! Timeout and retry wrapper for backend calls.
//!
//! Every attempt is bounded by [`RetryPolicy::timeout`]. Failures that may
//! succeed on a second try (timeouts, transport errors, 5xx, 429) are retried
//! with exponential backoff; everything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use super::BackendError;
use crate::config::BackendConfig;

/// Default delay before the first retry.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Default cap on any single backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// How many times to try a backend call, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub attempts: u32,
    /// Limit on each attempt.
    pub timeout: Duration,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy from backend configuration.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            attempts: config.retries.saturating_add(1),
            timeout: config.timeout,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// The same timeout with no retries, for calls that must not repeat.
    #[must_use]
    pub const fn single_attempt(self) -> Self {
        Self {
            attempts: 1,
            ..self
        }
    }

    /// Backoff before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(8),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Run `op` under `policy`.
///
/// `label` names the call in logs. A 429 is retried after its `Retry-After`
/// delay when that fits under `max_delay`; a longer wait is returned to the
/// caller as the rate-limit error.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, the first
/// non-retryable error, or [`BackendError::Timeout`] when the final attempt
/// runs out of time.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => BackendError::Timeout,
        };

        if !error.is_retryable() || attempt >= attempts {
            return Err(error);
        }

        let delay = match &error {
            BackendError::RateLimited(secs) => {
                let wait = Duration::from_secs(*secs);
                if wait > policy.max_delay {
                    return Err(error);
                }
                wait
            }
            _ => policy.delay_for(attempt),
        };

        tracing::warn!(
            call = label,
            attempt,
            max_attempts = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "Backend call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            timeout: Duration::from_millis(200),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn server_error() -> BackendError {
        BackendError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            attempts: 5,
            timeout: Duration::from_secs(1),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry(&fast(3), "test", || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(server_error()) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(&fast(5), "test", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(BackendError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(BackendError::Unauthorized)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(&fast(2), "test", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(matches!(result, Err(BackendError::Api { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out() {
        let mut policy = fast(1);
        policy.timeout = Duration::from_millis(10);

        let result: Result<(), _> = with_retry(&policy, "test", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(BackendError::Timeout)));
    }

    #[tokio::test]
    async fn test_long_retry_after_is_not_waited_out() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(&fast(3), "test", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(BackendError::RateLimited(60)) }
        })
        .await;

        assert!(matches!(result, Err(BackendError::RateLimited(60))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_single_attempt_keeps_timeout() {
        let policy = RetryPolicy::default().single_attempt();
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.timeout, Duration::from_secs(8));
    }
}
