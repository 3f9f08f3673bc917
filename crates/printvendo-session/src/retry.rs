//! Retry logic with exponential backoff for transient faults.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use printvendo_mailbox::MailboxError;

use crate::error::{Result, SessionError};

/// Retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,
    /// Base delay between retries
    base_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Calculate the delay for a given attempt (0-indexed).
    ///
    /// Uses exponential backoff with +-25% jitter to prevent thundering
    /// herd against the shared store.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // Exponential backoff: base_delay * 2^(attempt-1)
        let multiplier = 2u64.saturating_pow(attempt - 1);
        let base = self.base_delay.saturating_mul(multiplier as u32);

        // Cap at max_delay
        let capped = std::cmp::min(base, self.max_delay);

        // Add +-25% jitter
        let jitter_range = capped.as_millis() as u64 / 4;
        if jitter_range == 0 {
            return capped;
        }
        let jitter = rand::random::<u64>() % (jitter_range * 2);
        let jittered_ms = (capped.as_millis() as u64)
            .saturating_sub(jitter_range)
            .saturating_add(jitter);
        Duration::from_millis(jittered_ms)
    }

    /// Execute an async operation with retry logic.
    ///
    /// Only retries on retryable errors (store/upstream transients).
    /// Returns immediately on anything else.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(attempt, ?delay, "retrying after delay");
                sleep(delay).await;
            }

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() && attempt + 1 < self.max_attempts {
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            error = %e,
                            "retryable error, will retry"
                        );
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(SessionError::Store(MailboxError::Timeout(
            "max retries exceeded".into(),
        ))))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> SessionError {
        SessionError::Store(MailboxError::Timeout("tick".into()))
    }

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(5));

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);

        // Exponential backoff with +-25% jitter: base 100ms -> [75, 125]
        let d1 = policy.delay_for_attempt(1);
        assert!(
            d1 >= Duration::from_millis(75) && d1 <= Duration::from_millis(125),
            "attempt 1 delay {d1:?} outside +-25% of 100ms"
        );

        let d3 = policy.delay_for_attempt(3);
        assert!(
            d3 >= Duration::from_millis(300) && d3 <= Duration::from_millis(500),
            "attempt 3 delay {d3:?} outside +-25% of 400ms"
        );
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));
        let d10 = policy.delay_for_attempt(10);
        assert!(
            d10 >= Duration::from_millis(375) && d10 <= Duration::from_millis(625),
            "attempt 10 delay {d10:?} outside +-25% of the 500ms cap"
        );
    }

    #[tokio::test]
    async fn test_execute_success_first_attempt() {
        let policy = RetryPolicy::default();
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_transient_errors() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_no_retry_on_validation() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<i32> = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(SessionError::Validation("empty prompt".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(SessionError::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_max_retries_exceeded() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(100));
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<i32> = policy
            .execute(|| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(matches!(result, Err(SessionError::Store(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
