use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use plyt_core::PlytResult;
use tracing::{debug, warn};

type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Bounded retry for transient upstream failures.
///
/// `backoff(n)` is the pause after the n-th failed attempt (1-based).
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffFn,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(4, Duration::from_secs(1), Duration::from_secs(8))
    }
}

impl RetryPolicy {
    pub fn new<F>(max_attempts: u32, backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    /// `base * 2^(n-1)`, capped at `max`.
    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self::new(max_attempts, move |attempt| {
            let factor = 1u32 << attempt.saturating_sub(1).min(16);
            base.saturating_mul(factor).min(max)
        })
    }

    /// No pause between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, |_| Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or `max_attempts` is used up. The last error is returned as is.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> PlytResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlytResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(
                            operation = operation_name,
                            attempt,
                            error = %err,
                            "giving up after repeated transient failures"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plyt_core::PlytError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let policy =
            RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("search", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(PlytError::TransientUpstream("503".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: PlytResult<()> = RetryPolicy::immediate(4)
            .run("search", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PlytError::Network("reset".into())) }
            })
            .await;
        assert!(matches!(result, Err(PlytError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: PlytResult<()> = RetryPolicy::immediate(4)
            .run("search", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PlytError::QuotaExceeded("daily".into())) }
            })
            .await;
        assert!(matches!(result, Err(PlytError::QuotaExceeded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backoff_fn_sees_attempt_numbers() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let policy = RetryPolicy::new(3, move |attempt| {
            recorder.lock().unwrap().push(attempt);
            Duration::ZERO
        });
        let _: PlytResult<()> = policy
            .run("add", || async { Err(PlytError::TransientUpstream("500".into())) })
            .await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
