//! Interruptible waits between attempts.

use std::thread;
use std::time::Duration;

use super::cancel::CancellationToken;

/// Granularity at which a cancellable wait polls its token.
///
/// Bounds the latency between a cancellation request and the wait noticing it.
pub const SLEEP_INCREMENT: Duration = Duration::from_millis(10);

/// Block the current thread for `duration`, returning early if `token` is
/// cancelled.
///
/// Returns `true` when cancellation was observed, `false` when the full
/// duration elapsed. A token that [cannot be cancelled] gets a single plain
/// sleep.
///
/// [cannot be cancelled]: CancellationToken::can_be_cancelled
///
/// # Examples
///
/// ```rust
/// use reprise::{CancellationSource, interruptible_sleep};
/// use std::time::Duration;
///
/// let source = CancellationSource::new();
/// source.cancel();
///
/// // Already cancelled: returns at once.
/// assert!(interruptible_sleep(Duration::from_secs(60), &source.token()));
/// ```
pub fn interruptible_sleep(duration: Duration, token: &CancellationToken) -> bool {
    if !token.can_be_cancelled() {
        thread::sleep(duration);
        return false;
    }

    let mut remaining = duration;
    while !remaining.is_zero() && !token.is_cancellation_requested() {
        let step = remaining.min(SLEEP_INCREMENT);
        thread::sleep(step);
        remaining -= step;
    }

    token.is_cancellation_requested()
}

/// How the executor waits between attempts.
///
/// [`ThreadSleeper`] is the production implementation. Substitute another to
/// observe or skip waits, e.g. [`RecordingSleeper`](crate::testing::RecordingSleeper)
/// in tests.
pub trait Sleeper {
    /// Wait for `duration` unless `token` is cancelled first.
    ///
    /// Returns `true` if the wait was cut short by cancellation.
    fn sleep(&mut self, duration: Duration, token: &CancellationToken) -> bool;
}

/// Blocking [`Sleeper`] backed by [`interruptible_sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration, token: &CancellationToken) -> bool {
        interruptible_sleep(duration, token)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &mut S {
    fn sleep(&mut self, duration: Duration, token: &CancellationToken) -> bool {
        (**self).sleep(duration, token)
    }
}

#[cfg(test)]
mod sleep_tests {
    use super::*;
    use crate::retry::cancel::CancellationSource;
    use std::time::Instant;

    #[test]
    fn test_uncancellable_sleep_runs_full_duration() {
        let start = Instant::now();
        let cancelled = interruptible_sleep(Duration::from_millis(30), &CancellationToken::none());

        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancellable_sleep_completes_when_not_cancelled() {
        let source = CancellationSource::new();
        let start = Instant::now();
        let cancelled = interruptible_sleep(Duration::from_millis(35), &source.token());

        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn test_pre_cancelled_returns_immediately() {
        let source = CancellationSource::new();
        source.cancel();

        let start = Instant::now();
        assert!(interruptible_sleep(Duration::from_secs(30), &source.token()));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_zero_duration_not_cancelled() {
        let source = CancellationSource::new();
        assert!(!interruptible_sleep(Duration::ZERO, &source.token()));
    }

    #[test]
    fn test_zero_duration_reports_prior_cancel() {
        let source = CancellationSource::new();
        source.cancel();
        assert!(interruptible_sleep(Duration::ZERO, &source.token()));
    }

    #[test]
    fn test_cancel_during_sleep_cuts_it_short() {
        let source = CancellationSource::new();
        let token = source.token();

        let start = Instant::now();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(50));
                source.cancel();
            });
            assert!(interruptible_sleep(Duration::from_secs(30), &token));
        });

        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_thread_sleeper_delegates() {
        let mut sleeper = ThreadSleeper;
        assert!(!sleeper.sleep(Duration::from_millis(1), &CancellationToken::none()));
    }
}
