//! The retry control loop.

use std::fmt;
use std::time::Duration;

use super::cancel::CancellationToken;
use super::error::RetryError;
use super::policy::BackoffPolicy;
use super::sleep::{Sleeper, ThreadSleeper};

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

type Operation<'a, T, E> = Box<dyn FnMut() -> Result<T, E> + 'a>;
type ResultPredicate<'a, T> = Box<dyn FnMut(&T) -> bool + 'a>;
type ErrorPredicate<'a, E> = Box<dyn FnMut(&E) -> bool + 'a>;
type RetryHook<'a> = Box<dyn FnMut(&RetryEvent<'_>) + 'a>;

/// Why the previous attempt is being retried.
pub enum RetryCause<'a> {
    /// The operation returned a value the result predicate asked to retry.
    Result,
    /// The operation failed with an error the error predicate asked to retry.
    Error(&'a dyn fmt::Display),
}

impl fmt::Debug for RetryCause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Result => f.write_str("Result"),
            RetryCause::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
        }
    }
}

/// Information about an upcoming retry, passed to [`Retry::on_retry`].
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// The attempt about to run (1-indexed, so always at least 2).
    pub attempt: u32,
    /// Backoff that will be waited before it runs.
    pub delay: Duration,
    /// What went wrong with the previous attempt.
    pub cause: RetryCause<'a>,
}

/// Outcome of an attempt that asked to be retried.
enum Pending<E> {
    Result,
    Error(E),
}

impl<E: fmt::Display> Pending<E> {
    fn cause(&self) -> RetryCause<'_> {
        match self {
            Pending::Result => RetryCause::Result,
            Pending::Error(e) => RetryCause::Error(e),
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, is cancelled, or uses
/// up `max_attempts` invocations.
///
/// - An `Ok(value)` for which `should_retry(&value)` is false ends the sequence
///   with `Ok(value)`.
/// - An `Err(error)` for which `should_retry_error(&error)` is false ends it with
///   [`RetryError::Rejected`] carrying the error's `Display` text.
/// - Anything else is retried after waiting
///   [`policy.get_delay(n)`](BackoffPolicy::get_delay), where `n` is the number
///   of attempts made so far. Cancellation observed during that wait ends the
///   sequence with [`RetryError::Cancelled`].
/// - After `max_attempts` invocations the result is [`RetryError::Exhausted`].
///
/// Waits block the calling thread. Cancellation is only checked while waiting,
/// never while the operation runs.
///
/// # Examples
///
/// ```rust
/// use reprise::{retry, BackoffPolicy, CancellationToken};
/// use std::time::Duration;
///
/// let mut calls = 0;
/// let result = retry(
///     || {
///         calls += 1;
///         if calls < 3 { Err("busy") } else { Ok(calls) }
///     },
///     |_| false,
///     |_| true,
///     5,
///     BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(4)),
///     CancellationToken::none(),
/// );
///
/// assert_eq!(result, Ok(3));
/// ```
pub fn retry<T, E, F, R, P>(
    operation: F,
    should_retry: R,
    should_retry_error: P,
    max_attempts: u32,
    policy: BackoffPolicy,
    token: CancellationToken,
) -> Result<T, RetryError>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
    R: FnMut(&T) -> bool,
    P: FnMut(&E) -> bool,
{
    let mut policy = policy;
    drive(
        operation,
        should_retry,
        should_retry_error,
        |_: &RetryEvent<'_>| {},
        max_attempts,
        &mut policy,
        &token,
        ThreadSleeper,
    )
}

/// Builder over [`retry`] with defaults for every argument but the operation.
///
/// Defaults: [`DEFAULT_MAX_ATTEMPTS`] attempts, [`BackoffPolicy::default`],
/// [`CancellationToken::none`], every `Ok` accepted, every `Err` retried.
///
/// # Examples
///
/// ```rust
/// use reprise::{BackoffPolicy, Retry};
/// use std::time::Duration;
///
/// let mut status_codes = vec![200, 503, 503].into_iter();
///
/// let result = Retry::new(|| Ok::<_, String>(status_codes.next_back().unwrap_or(500)))
///     .with_max_attempts(3)
///     .with_policy(BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(2)))
///     .retry_if_result(|status| *status >= 500)
///     .run();
///
/// assert_eq!(result, Ok(200));
/// ```
pub struct Retry<'a, T, E> {
    operation: Operation<'a, T, E>,
    should_retry: ResultPredicate<'a, T>,
    should_retry_error: ErrorPredicate<'a, E>,
    on_retry: Option<RetryHook<'a>>,
    max_attempts: u32,
    policy: BackoffPolicy,
    token: CancellationToken,
}

impl<'a, T, E> Retry<'a, T, E> {
    /// Start a builder for `operation`.
    pub fn new(operation: impl FnMut() -> Result<T, E> + 'a) -> Self {
        Self {
            operation: Box::new(operation),
            should_retry: Box::new(|_: &T| false),
            should_retry_error: Box::new(|_: &E| true),
            on_retry: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            policy: BackoffPolicy::default(),
            token: CancellationToken::none(),
        }
    }

    /// Set the maximum number of invocations, including the first.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff policy.
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Allow the sequence to be cancelled through `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Retry successful values for which `predicate` returns true.
    pub fn retry_if_result(mut self, predicate: impl FnMut(&T) -> bool + 'a) -> Self {
        self.should_retry = Box::new(predicate);
        self
    }

    /// Retry errors for which `predicate` returns true; others end the sequence.
    pub fn retry_if_error(mut self, predicate: impl FnMut(&E) -> bool + 'a) -> Self {
        self.should_retry_error = Box::new(predicate);
        self
    }

    /// Observe each retry after its delay is chosen and before the wait begins.
    pub fn on_retry(mut self, hook: impl FnMut(&RetryEvent<'_>) + 'a) -> Self {
        self.on_retry = Some(Box::new(hook));
        self
    }
}

impl<T, E: fmt::Display> Retry<'_, T, E> {
    /// Run the sequence, blocking the current thread during backoff.
    pub fn run(self) -> Result<T, RetryError> {
        self.run_with_sleeper(ThreadSleeper)
    }

    /// Run the sequence, waiting through `sleeper`.
    pub fn run_with_sleeper<S: Sleeper>(self, sleeper: S) -> Result<T, RetryError> {
        let Retry {
            operation,
            should_retry,
            should_retry_error,
            mut on_retry,
            max_attempts,
            mut policy,
            token,
        } = self;

        drive(
            operation,
            should_retry,
            should_retry_error,
            |event: &RetryEvent<'_>| {
                if let Some(hook) = on_retry.as_mut() {
                    hook(event);
                }
            },
            max_attempts,
            &mut policy,
            &token,
            sleeper,
        )
    }
}

impl<T, E> fmt::Debug for Retry<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("max_attempts", &self.max_attempts)
            .field("policy", &self.policy)
            .field("token", &self.token)
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::too_many_arguments)]
fn drive<T, E, F, R, P, H, S>(
    mut operation: F,
    mut should_retry: R,
    mut should_retry_error: P,
    mut on_retry: H,
    max_attempts: u32,
    policy: &mut BackoffPolicy,
    token: &CancellationToken,
    mut sleeper: S,
) -> Result<T, RetryError>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
    R: FnMut(&T) -> bool,
    P: FnMut(&E) -> bool,
    H: FnMut(&RetryEvent<'_>),
    S: Sleeper,
{
    let mut pending: Option<Pending<E>> = None;

    for attempt in 0..max_attempts {
        // Only a retried attempt leaves `pending` set, so this skips attempt 0.
        if let Some(previous) = pending.take() {
            let delay = policy.get_delay(attempt);
            let event = RetryEvent {
                attempt: attempt + 1,
                delay,
                cause: previous.cause(),
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = event.attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                cause = ?event.cause,
                "retrying after backoff"
            );

            on_retry(&event);

            if sleeper.sleep(delay, token) {
                #[cfg(feature = "tracing")]
                tracing::info!(attempt = attempt + 1, "retry cancelled during backoff");
                return Err(RetryError::Cancelled);
            }
        }

        match operation() {
            Ok(value) => {
                if !should_retry(&value) {
                    return Ok(value);
                }
                pending = Some(Pending::Result);
            }
            Err(error) => {
                if !should_retry_error(&error) {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt = attempt + 1, error = %error, "non-retryable error");
                    return Err(RetryError::rejected(&error));
                }
                pending = Some(Pending::Error(error));
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::warn!(max_attempts, "retry attempts exhausted");

    Err(RetryError::Exhausted {
        attempts: max_attempts,
    })
}
