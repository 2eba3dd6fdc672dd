// 🔁 Retry with exponential backoff
//
// Wraps any async call. The wait before attempt n+1 is
// multiplier * 2^(n-1), clamped to [min_wait, max_wait].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, multiplier: Duration, min_wait: Duration, max_wait: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            multiplier,
            min_wait,
            max_wait: max_wait.max(min_wait),
        }
    }

    /// Call once, never retry
    pub fn no_retry() -> Self {
        RetryPolicy::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Wait after the given (1-based) failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(factor)
            .max(self.min_wait)
            .min(self.max_wait)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, mut operation: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "call failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, multiplier 1s, waits clamped to 4s..10s
    fn default() -> Self {
        RetryPolicy::new(
            3,
            Duration::from_secs(1),
            Duration::from_secs(4),
            Duration::from_secs(10),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            attempts,
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
    }

    #[test]
    fn test_default_backoff_curve() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(10));
        assert_eq!(policy.backoff(30), Duration::from_secs(10));
    }

    #[test]
    fn test_constructor_normalizes_bounds() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), Duration::from_secs(9), Duration::from_secs(2));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_wait, Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<&str, String> = quick_policy(3)
            .run(
                |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok("done") }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let result: Result<u32, String> = quick_policy(3)
            .run(
                |attempt| async move {
                    if attempt < 3 {
                        Err(format!("boom {}", attempt))
                    } else {
                        Ok(attempt)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = quick_policy(3)
            .run(
                |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err("still down".to_string()) }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap_err(), "still down");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = quick_policy(3)
            .run(
                |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err("bad output".to_string()) }
                },
                |err| !err.starts_with("bad"),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_waits_between_attempts() {
        let start = tokio::time::Instant::now();

        let result: Result<(), String> = RetryPolicy::default()
            .run(|_| async { Err("timeout".to_string()) }, |_| true)
            .await;

        assert!(result.is_err());
        // Two waits of 4s between three attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(8), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(9), "elapsed {:?}", elapsed);
    }
}
