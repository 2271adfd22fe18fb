//! Async counterpart of the retry loop, driven by the tokio timer.
//!
//! Feature-gated behind `#[cfg(feature = "async")]`. Semantics match
//! [`retry`](crate::retry::retry) exactly; only the waiting differs.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::cancel::CancellationToken;
use super::error::RetryError;
use super::policy::BackoffPolicy;
use super::sleep::SLEEP_INCREMENT;

/// Async version of [`interruptible_sleep`](crate::retry::interruptible_sleep).
///
/// Polls `token` every [`SLEEP_INCREMENT`] and returns `true` if cancellation
/// was observed before `duration` elapsed.
pub async fn interruptible_sleep_async(duration: Duration, token: &CancellationToken) -> bool {
    if !token.can_be_cancelled() {
        tokio::time::sleep(duration).await;
        return false;
    }

    let mut remaining = duration;
    while !remaining.is_zero() && !token.is_cancellation_requested() {
        let step = remaining.min(SLEEP_INCREMENT);
        tokio::time::sleep(step).await;
        remaining -= step;
    }

    token.is_cancellation_requested()
}

/// Retry an async operation.
///
/// # Example
///
/// ```rust
/// use reprise::{retry_async, BackoffPolicy, CancellationToken};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let result = retry_async(
///     || async { Ok::<_, String>(42) },
///     |_| false,
///     |_| true,
///     3,
///     BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(5)),
///     CancellationToken::none(),
/// )
/// .await;
///
/// assert_eq!(result, Ok(42));
/// # });
/// ```
pub async fn retry_async<T, E, F, Fut, R, P>(
    mut operation: F,
    mut should_retry: R,
    mut should_retry_error: P,
    max_attempts: u32,
    mut policy: BackoffPolicy,
    token: CancellationToken,
) -> Result<T, RetryError>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&T) -> bool,
    P: FnMut(&E) -> bool,
{
    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = policy.get_delay(attempt);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "retrying after backoff"
            );

            if interruptible_sleep_async(delay, &token).await {
                #[cfg(feature = "tracing")]
                tracing::info!(attempt = attempt + 1, "retry cancelled during backoff");
                return Err(RetryError::Cancelled);
            }
        }

        match operation().await {
            Ok(value) => {
                if !should_retry(&value) {
                    return Ok(value);
                }
            }
            Err(error) => {
                if !should_retry_error(&error) {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt = attempt + 1, error = %error, "non-retryable error");
                    return Err(RetryError::rejected(&error));
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::warn!(max_attempts, "retry attempts exhausted");

    Err(RetryError::Exhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod future_tests {
    use super::*;
    use crate::retry::cancel::CancellationSource;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(4))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_async(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok("done")
                    }
                }
            },
            |_| false,
            |_| true,
            5,
            fast_policy(),
            CancellationToken::none(),
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_budget() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_async(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("down")
                }
            },
            |_| false,
            |_| true,
            3,
            fast_policy(),
            CancellationToken::none(),
        )
        .await;

        assert_eq!(result, Err(RetryError::Exhausted { attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops() {
        let result = retry_async(
            || async { Err::<(), _>("permission denied") },
            |_| false,
            |_| false,
            5,
            fast_policy(),
            CancellationToken::none(),
        )
        .await;

        assert_eq!(result, Err(RetryError::rejected("permission denied")));
    }

    #[tokio::test]
    async fn test_cancelled_before_backoff() {
        let source = CancellationSource::new();
        source.cancel();
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_async(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(0)
                }
            },
            |_| true,
            |_| true,
            5,
            BackoffPolicy::new(Duration::from_secs(10), 2.0, Duration::from_secs(10)),
            source.token(),
        )
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_uncancellable_async_sleep_completes() {
        let cancelled =
            interruptible_sleep_async(Duration::from_millis(5), &CancellationToken::none()).await;
        assert!(!cancelled);
    }

    #[tokio::test]
    async fn test_async_sleep_observes_cancel() {
        let source = CancellationSource::new();
        let token = source.token();

        let waiter = tokio::spawn(async move {
            interruptible_sleep_async(Duration::from_secs(30), &token).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();

        assert!(waiter.await.unwrap());
    }
}
