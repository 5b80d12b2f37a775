//! Retry policy implementation.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::config::RetryConfig;

/// Failure returned once a retried operation gives up.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The operation failed with an error the predicate refused to retry.
    #[error("non-retryable failure on attempt {attempts}: {source}")]
    Permanent { attempts: u32, source: E },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Permanent { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The error produced by the last attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Permanent { source, .. } => source,
        }
    }

    /// Unwrap the error produced by the last attempt.
    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::Permanent { source, .. } => source,
        }
    }
}

/// Bounded retry with exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from configuration. An attempt ceiling of 0 is treated as 1.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier.max(1.0),
        }
    }

    /// A policy that retries without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Maximum number of invocations, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `operation`, retrying every failure.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_when(|_: &E| true, operation).await
    }

    /// Run `operation`, retrying only failures for which `is_retryable` holds.
    pub async fn execute_when<T, E, P, F, Fut>(
        &self,
        is_retryable: P,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + 'static,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !is_retryable(&e) => {
                    return Err(RetryError::Permanent {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt, self.max_attempts, delay, e
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Error)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("fatal")]
        Fatal,
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let policy = RetryPolicy::immediate(5);
        let calls = &AtomicU32::new(0);

        let result = policy
            .execute(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 3 {
                    Err(TestError::Transient)
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_always_failing_stops_at_max_attempts() {
        let policy = RetryPolicy::immediate(3);
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
        assert_eq!(err.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "gave up after 3 attempts: transient");
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute_when(
                |e: &TestError| matches!(e, TestError::Transient),
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                },
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Permanent { attempts: 1, .. }));
        assert!(matches!(err.last_error(), TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_runs_once() {
        let policy = RetryPolicy::immediate(0);
        let calls = &AtomicU32::new(0);

        let _: Result<(), _> = policy
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 10,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        });

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
        assert_eq!(policy.delay_after(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(30), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        });
        let start = tokio::time::Instant::now();

        let _: Result<(), _> = policy.execute(|| async { Err(TestError::Transient) }).await;

        // 1s after the first failure, 2s after the second, none after the last.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
