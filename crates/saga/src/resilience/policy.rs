use std::future::Future;

use thiserror::Error;

use super::breaker::CircuitBreaker;
use super::retry::RetryConfig;

/// Classifies errors as worth retrying or not.
pub trait Transient {
    /// True for failures that may succeed on a later attempt.
    fn is_transient(&self) -> bool;
}

/// Why a guarded call did not produce a value.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The circuit was open; the operation was not invoked.
    #[error("{operation}: circuit open")]
    CircuitOpen { operation: &'static str },

    /// The last attempt ran into the per-attempt timeout.
    #[error("{operation}: timed out after {attempts} attempt(s)")]
    TimedOut {
        operation: &'static str,
        attempts: u32,
    },

    /// Every attempt failed with a transient error.
    #[error("{operation}: failed after {attempts} attempt(s): {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        last: E,
    },

    /// The operation failed with an error that retrying cannot fix.
    #[error("{operation}: {error}")]
    Rejected { operation: &'static str, error: E },
}

impl<E> ResilienceError<E> {
    /// True when the dependency could not be reached or answered in time.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, ResilienceError::Rejected { .. })
    }
}

enum Attempt<E> {
    TimedOut,
    Failed(E),
}

/// Retry, per-attempt timeout and circuit breaking around calls to one
/// remote dependency.
#[derive(Debug)]
pub struct ResiliencePolicy {
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl ResiliencePolicy {
    pub fn new(retry: RetryConfig, breaker: CircuitBreaker) -> Self {
        Self { retry, breaker }
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `op` with retries and timeouts, behind the circuit breaker.
    ///
    /// Every attempt is reported to the breaker except those ending in a
    /// non-transient error. Once the breaker opens, the remaining attempts
    /// are skipped and `CircuitOpen` is returned.
    pub async fn call<T, E, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, true, op).await
    }

    /// Runs `op` with retries and timeouts but without consulting or
    /// updating the breaker.
    pub async fn call_unguarded<T, E, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, false, op).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        operation: &'static str,
        guarded: bool,
        mut op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if guarded && !self.breaker.try_acquire() {
                tracing::warn!(operation, attempt, "circuit open, call skipped");
                return Err(ResilienceError::CircuitOpen { operation });
            }

            let failure = match tokio::time::timeout(self.retry.call_timeout, op()).await {
                Ok(Ok(value)) => {
                    if guarded {
                        self.breaker.record_success();
                    }
                    if attempt > 0 {
                        tracing::debug!(operation, attempts = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(error)) if !error.is_transient() => {
                    if guarded {
                        self.breaker.record_ignored();
                    }
                    tracing::warn!(operation, %error, "permanent error, not retrying");
                    return Err(ResilienceError::Rejected { operation, error });
                }
                Ok(Err(error)) => Attempt::Failed(error),
                Err(_elapsed) => Attempt::TimedOut,
            };

            if guarded {
                self.breaker.record_failure();
            }
            attempt += 1;

            if attempt >= max_attempts {
                tracing::warn!(operation, attempts = attempt, "all attempts exhausted");
                return Err(match failure {
                    Attempt::TimedOut => ResilienceError::TimedOut {
                        operation,
                        attempts: attempt,
                    },
                    Attempt::Failed(last) => ResilienceError::Exhausted {
                        operation,
                        attempts: attempt,
                        last,
                    },
                });
            }

            let backoff = self.retry.backoff(attempt - 1);
            let backoff_ms = backoff.as_millis() as u64;
            match &failure {
                Attempt::TimedOut => {
                    tracing::debug!(
                        operation,
                        attempt,
                        backoff_ms,
                        "attempt timed out, backing off"
                    );
                }
                Attempt::Failed(error) => {
                    tracing::debug!(
                        operation,
                        attempt,
                        backoff_ms,
                        %error,
                        "transient error, backing off"
                    );
                }
            }
            metrics::counter!("resilience_retries_total", "operation" => operation).increment(1);
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::breaker::{CircuitBreakerConfig, CircuitState};
    use chrono::NaiveDate;
    use common::ManualClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Flaky)
        }
    }

    fn policy(max_attempts: u32, threshold: u32) -> (ResiliencePolicy, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ));
        let retry = RetryConfig {
            max_attempts,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            jitter_factor: 0.0,
            call_timeout: Duration::from_millis(50),
        };
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig {
                failure_threshold: threshold,
                failure_window: Duration::from_secs(60),
                cooldown: Duration::from_secs(30),
            },
            clock.clone(),
        );
        (ResiliencePolicy::new(retry, breaker), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_until_success() {
        let (policy, _) = policy(3, 10);
        let calls = AtomicU32::new(0);

        let result = policy
            .call("op", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Flaky)
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(policy.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_are_not_retried() {
        let (policy, _) = policy(3, 1);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::Rejected {
                error: TestError::Fatal,
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_last_error() {
        let (policy, _) = policy(3, 10);

        let result: Result<(), _> = policy.call("op", || async { Err(TestError::Flaky) }).await;

        match result {
            Err(ResilienceError::Exhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, TestError::Flaky);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_calls_time_out() {
        let (policy, _) = policy(2, 10);
        let calls = AtomicU32::new(0);

        let result: Result<(), ResilienceError<TestError>> = policy
            .call("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                std::future::pending()
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::TimedOut { attempts: 2, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opens_mid_retry_and_short_circuits() {
        let (policy, _) = policy(5, 2);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Flaky)
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(policy.breaker().state(), CircuitState::Open);

        // Further calls never reach the operation
        let result: Result<(), _> = policy
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(())
            })
            .await;
        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_after_cooldown_closes_the_circuit() {
        let (policy, clock) = policy(1, 1);
        let _ = policy
            .call("op", || async { Err::<(), _>(TestError::Flaky) })
            .await;
        assert_eq!(policy.breaker().state(), CircuitState::Open);

        clock.advance(Duration::from_secs(30));
        let result = policy.call("op", || async { Ok::<_, TestError>(1) }).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(policy.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unguarded_calls_ignore_an_open_circuit() {
        let (policy, _) = policy(2, 1);
        let _ = policy
            .call("op", || async { Err::<(), _>(TestError::Flaky) })
            .await;
        assert_eq!(policy.breaker().state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let result = policy
            .call_unguarded("op", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TestError::Flaky)
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(policy.breaker().state(), CircuitState::Open);
    }
}
