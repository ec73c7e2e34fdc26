// Retry loop for transient transport faults
//
// Wraps a single logical call. Only network-level failures that a fresh
// attempt could fix are absorbed here; anything the backend answered with
// (envelope codes, parse failures, 4xx) propagates on the first attempt.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;

/// How many times to attempt a call and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Wait after the given 1-based attempt failed. Linear, so never
    /// decreasing in `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Runs one call under a [`RetryPolicy`], honouring cancellation.
#[derive(Debug, Clone, Default)]
pub struct RetryingExecutor {
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `call` until it succeeds, fails with a non-transient error,
    /// or the attempt budget runs out.
    ///
    /// `call` is invoked fresh for every attempt. Cancelling `cancel`
    /// aborts both an in-flight attempt and a pending backoff sleep, and
    /// yields [`Error::Cancelled`].
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                result = call() => result,
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient_transport() {
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(operation, attempts = attempt, error = %err, "retry budget exhausted");
                return Err(err);
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::NetworkKind;

    /// Stub that times out `failures` times, then returns its call count.
    fn flaky(failures: u32, calls: &Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32, Error>> {
        let calls = Arc::clone(calls);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= failures {
                Err(Error::timeout("read timed out"))
            } else {
                Ok(n)
            })
        }
    }

    #[test]
    fn backoff_is_linear_and_non_decreasing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert!(policy.backoff(3) >= policy.backoff(2));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_transient_failures() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();

        for k in 0..3 {
            let calls = Arc::new(AtomicU32::new(0));
            let result = executor.execute("op", &cancel, flaky(k, &calls)).await;
            let value = assert_ok!(result);
            assert_eq!(value, k + 1);
            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_raises_last_fault() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result = executor.execute("op", &cancel, flaky(10, &calls)).await;
        assert!(matches!(
            result,
            Err(Error::Network {
                kind: NetworkKind::Timeout,
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), Error> = executor
            .execute("op", &cancel, || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(Error::http_status(400, "bad request")))
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_are_retried() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), Error> = executor
            .execute("op", &cancel, || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(Error::http_status(503, "unavailable")))
            })
            .await;

        assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn envelope_codes_are_not_retried() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), Error> = executor
            .execute("login", &cancel, || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(crate::codes::classify(6, "login")))
            })
            .await;

        assert!(matches!(result, Err(Error::Server { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_pending_backoff() {
        let executor = RetryingExecutor::new(RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(60),
        });
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result = executor.execute("op", &cancel, flaky(10, &calls)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_cancelled_never_calls() {
        let executor = RetryingExecutor::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));

        let result = executor.execute("op", &cancel, flaky(0, &calls)).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
