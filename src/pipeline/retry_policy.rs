//! Retry policy for calls to external services.
//!
//! Implements exponential backoff with configurable parameters. The policy is
//! a plain value: concurrent callers share it without any mutable state.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::RetrySettings;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first call included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: settings.initial_delay,
            backoff_factor: settings.backoff_factor,
        }
    }

    /// A policy that never sleeps, for callers that only want attempt capping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Delay slept after the `failed_attempts`-th failure.
    ///
    /// Uses exponential backoff: `initial_delay * factor^(failed_attempts - 1)`.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1) as i32;
        scale(self.initial_delay, self.backoff_factor.powi(exponent))
    }

    /// Total time slept when the first `failures` attempts fail.
    pub fn cumulative_delay(&self, failures: u32) -> Duration {
        (1..=failures).fold(Duration::ZERO, |total, n| {
            total.saturating_add(self.delay_after(n))
        })
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the first success, or the error of the last attempt.
    pub async fn run<T, E, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            debug!("Attempt {}/{} for {}", attempt, max_attempts, operation_name);
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    error!(
                        "{} failed after {} attempts: {}",
                        operation_name, max_attempts, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} attempt {} failed: {}. Retrying in {:.2}s...",
                        operation_name,
                        attempt,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    delay = scale(delay, self.backoff_factor);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn failing_n_times(
        calls: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, String>> {
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= failures {
                std::future::ready(Err(format!("failure #{}", call)))
            } else {
                std::future::ready(Ok("done"))
            }
        }
    }

    #[test]
    fn test_new_from_settings() {
        let settings = RetrySettings {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 3.0,
        };
        let policy = RetryPolicy::new(&settings);

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.backoff_factor, 3.0);
    }

    #[test]
    fn test_default() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.backoff_factor, 2.0);
    }

    #[test]
    fn test_delay_calculation() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        };

        // 1 * 2^0 = 1
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        // 1 * 2^1 = 2
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        // 1 * 2^3 = 8
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));

        assert_eq!(policy.cumulative_delay(0), Duration::ZERO);
        assert_eq!(policy.cumulative_delay(3), Duration::from_secs(7));
    }

    #[test]
    fn test_delay_has_no_cap() {
        let policy = RetryPolicy {
            max_attempts: 30,
            initial_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        };

        // 60 * 2^20, far beyond a day
        assert_eq!(policy.delay_after(21), Duration::from_secs(60 * (1 << 20)));
    }

    #[test]
    fn test_delay_saturates_instead_of_panicking() {
        let policy = RetryPolicy {
            max_attempts: u32::MAX,
            initial_delay: Duration::from_secs(60),
            backoff_factor: 10.0,
        };

        assert_eq!(policy.delay_after(1_000), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_sleep() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy
            .run("op", failing_n_times(calls.clone(), 0))
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_k_failures_sleeps_geometric_sum() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy
            .run("op", failing_n_times(calls.clone(), 3))
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // initial * (factor^k - 1) / (factor - 1) = 1 * (8 - 1) / 1 = 7
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_stops_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            backoff_factor: 3.0,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy
            .run("op", failing_n_times(calls.clone(), u32::MAX))
            .await;

        // The last error surfaces, not the first
        assert_eq!(result, Err("failure #3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two sleeps: 2 + 6
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_attempts_still_runs_once() {
        let policy = RetryPolicy::immediate(0);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .run("op", failing_n_times(calls.clone(), u32::MAX))
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_share_policy() {
        let policy = Arc::new(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        });

        let mut handles = Vec::new();
        for failures in 0..3 {
            let policy = policy.clone();
            handles.push(tokio::spawn(async move {
                let calls = Arc::new(AtomicU32::new(0));
                let result = policy.run("op", failing_n_times(calls.clone(), failures)).await;
                (result, calls.load(Ordering::SeqCst))
            }));
        }

        for (failures, handle) in handles.into_iter().enumerate() {
            let (result, calls) = handle.await.unwrap();
            assert_eq!(result, Ok("done"));
            assert_eq!(calls, failures as u32 + 1);
        }
    }
}
