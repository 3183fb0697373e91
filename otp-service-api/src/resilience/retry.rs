//! Bounded retry with a linearly growing delay.
//!
//! Used for the startup database ping: a fixed number of attempts, each
//! failure followed by a longer pause, and a hard failure once the attempts
//! run out.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Waits `step`, then `2 * step`, then `3 * step` and so on.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    max_attempts: usize,
    step: Duration,
}

impl LinearBackoff {
    pub fn new(max_attempts: usize, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// Delay to wait after the failed attempt with zero-based index `attempt`.
    ///
    /// Returns `None` once no attempts remain.
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }

        let steps = u32::try_from(attempt + 1).unwrap_or(u32::MAX);
        Some(self.step.saturating_mul(steps))
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// Error wrapper that includes retry attempt information
#[derive(Debug)]
pub struct RetryError<E> {
    /// The last error returned by the operation
    pub error: E,
    /// Number of attempts made
    pub attempts: usize,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operation failed after {} attempts: {}",
            self.attempts, self.error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Run `f` until it succeeds or the policy runs out of attempts.
pub async fn retry<F, Fut, T, E>(
    operation: &str,
    policy: &LinearBackoff,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;

    loop {
        debug!(operation, attempt = attempt + 1, max_attempts = policy.max_attempts(), "Attempting operation");

        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(operation, retries = attempt, "Operation succeeded after retries");
                }
                return Ok(result);
            }
            Err(e) => match policy.next_delay(attempt) {
                Some(delay) => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts(),
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(operation, attempts = attempt + 1, error = %e, "Max retry attempts reached");
                    return Err(RetryError {
                        error: e,
                        attempts: attempt + 1,
                    });
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: usize) -> LinearBackoff {
        LinearBackoff::new(max_attempts, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_retry_succeeds_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let result = retry("ping", &fast_policy(3), || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::Relaxed);
                Ok::<_, &str>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let result = retry("ping", &fast_policy(5), || {
            let c = counter_clone.clone();
            async move {
                let count = c.fetch_add(1, Ordering::Relaxed);
                if count < 3 {
                    Err("temporary error")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_retry_makes_exactly_max_attempts() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let result = retry("ping", &fast_policy(3), || {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::Relaxed);
                Err::<(), _>("permanent error")
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.error, "permanent error");
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_backoff_grows_by_step() {
        let policy = LinearBackoff::new(4, Duration::from_secs(1));

        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.next_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_secs(3)));
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = LinearBackoff::new(0, Duration::from_secs(1));

        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.next_delay(0), None);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        let policy = LinearBackoff::new(1, Duration::from_secs(1));
        assert_eq!(policy.next_delay(0), None);
    }

    #[test]
    fn test_retry_error_display() {
        let error = RetryError {
            error: "test error",
            attempts: 3,
        };

        let display = format!("{}", error);
        assert!(display.contains("3 attempts"));
        assert!(display.contains("test error"));
    }
}
