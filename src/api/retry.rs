//! Bounded exponential-backoff retry
//!
//! ```text
//! delay(n) = min(base * 2^n, max_delay) + uniform(0, jitter_ratio * that)
//! ```
//!
//! An operation is called at most `max_attempts + 1` times. Only errors
//! that [`ApiError::is_retryable`](crate::api::ApiError::is_retryable) are retried; anything else is returned
//! on the first failure.

use super::ApiResult;
use rand::Rng;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the initial call
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random jitter as a fraction of the capped delay
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            jitter_ratio: 0.3,
        }
    }
}

/// Delay before retry number `attempt` (0-indexed).
///
/// `jitter_fraction` is a draw from [0, 1]; the scheduler passes a random
/// one, tests pass fixed values.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, jitter_fraction: f64) -> Duration {
    let base_ms = u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX);
    let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    let capped = exponential.min(max_ms);

    let jitter_ms = capped as f64 * policy.jitter_ratio.max(0.0) * jitter_fraction.clamp(0.0, 1.0);
    let jitter = if jitter_ms.is_finite() && jitter_ms > 0.0 {
        Duration::from_micros((jitter_ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    };

    Duration::from_millis(capped) + jitter
}

/// Suspends the calling task between attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(delay)
    }
}

/// Returns immediately and remembers every requested delay
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
        std::future::ready(())
    }
}

/// Runs async operations under a [`RetryPolicy`]
#[derive(Debug)]
pub struct RetryScheduler<S = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryScheduler<TokioSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl Default for RetryScheduler<TokioSleeper> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<S: Sleeper> RetryScheduler<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `operation` with the policy's attempt ceiling
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.run_with_retry(label, self.policy.max_attempts, operation)
            .await
    }

    /// Run `operation`, retrying retryable failures up to `max_attempts` times
    pub async fn run_with_retry<T, F, Fut>(
        &self,
        label: &str,
        max_attempts: u32,
        mut operation: F,
    ) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{}: succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = backoff_delay(&self.policy, attempt, jitter_fraction());
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}",
                        label,
                        attempt + 1,
                        max_attempts + 1,
                        err,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!("{}: giving up after {} retries: {}", label, attempt, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

fn jitter_fraction() -> f64 {
    rand::rng().random::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scheduler() -> RetryScheduler<RecordingSleeper> {
        RetryScheduler::with_sleeper(RetryPolicy::default(), RecordingSleeper::new())
    }

    fn server_error() -> ApiError {
        ApiError::ServerError {
            status: 502,
            message: "bad gateway".into(),
        }
    }

    #[test]
    fn test_backoff_schedule_without_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, 0.0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&policy, 1, 0.0), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&policy, 4, 0.0), Duration::from_millis(16_000));
        assert_eq!(backoff_delay(&policy, 6, 0.0), Duration::from_millis(60_000));
        assert_eq!(backoff_delay(&policy, 40, 0.0), Duration::from_millis(60_000));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, 1.0), Duration::from_millis(1300));
        assert_eq!(backoff_delay(&policy, 10, 1.0), Duration::from_millis(78_000));
        // Out-of-range draws are clamped
        assert_eq!(backoff_delay(&policy, 0, 7.0), Duration::from_millis(1300));
        assert_eq!(backoff_delay(&policy, 0, f64::NAN), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_succeeds_after_three_retryable_failures() {
        let scheduler = scheduler();
        let calls = AtomicU32::new(0);

        let result = scheduler
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(server_error())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let delays = scheduler.sleeper().delays();
        assert_eq!(delays.len(), 3);
        assert!(delays[0] >= Duration::from_millis(1000) && delays[0] <= Duration::from_millis(1300));
        assert!(delays[2] >= Duration::from_millis(4000) && delays[2] <= Duration::from_millis(5200));
    }

    #[tokio::test]
    async fn test_always_failing_exhausts_attempts_and_rethrows_last() {
        let scheduler = scheduler();
        let calls = AtomicU32::new(0);

        let result: ApiResult<()> = scheduler
            .run_with_retry("test", 3, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::RateLimited {
                    status: 429,
                    message: format!("call {n}"),
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            result,
            Err(ApiError::RateLimited {
                status: 429,
                message: "call 3".into()
            })
        );
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let scheduler = scheduler();
        let calls = AtomicU32::new(0);

        let result: ApiResult<()> = scheduler
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::NotFound {
                    resource: "repository".into(),
                })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ApiError::NotFound { .. })));
        assert!(scheduler.sleeper().delays().is_empty());
    }

    #[tokio::test]
    async fn test_default_ceiling_is_five_retries() {
        let scheduler = scheduler();
        let calls = AtomicU32::new(0);

        let result: ApiResult<()> = scheduler
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::TransientNetwork("connection reset".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_zero_attempts_calls_once() {
        let scheduler = scheduler();
        let calls = AtomicU32::new(0);

        let result: ApiResult<()> = scheduler
            .run_with_retry("test", 0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
