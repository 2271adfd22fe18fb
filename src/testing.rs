//! Testing utilities for code that retries.
//!
//! [`RecordingSleeper`] replaces real waits so tests run instantly and can
//! assert on how many waits happened and for how long. The assertion macros
//! check which way a retry outcome went.
//!
//! # Examples
//!
//! ```rust
//! use reprise::testing::RecordingSleeper;
//! use reprise::{assert_retry_exhausted, Retry};
//!
//! let mut sleeper = RecordingSleeper::new();
//! let result = Retry::new(|| Err::<(), _>("unavailable"))
//!     .with_max_attempts(3)
//!     .run_with_sleeper(&mut sleeper);
//!
//! assert_retry_exhausted!(result, 3);
//! assert_eq!(sleeper.wait_count(), 2);
//! ```

use std::time::Duration;

use crate::retry::{CancellationToken, Sleeper};

/// A [`Sleeper`] that records requested waits without blocking.
///
/// Reports cancellation when the token is cancelled, or on the wait chosen
/// with [`cancel_on_wait`](Self::cancel_on_wait).
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Vec<Duration>,
    cancel_on: Option<usize>,
}

impl RecordingSleeper {
    /// A sleeper that never cancels on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report cancellation on the `n`-th wait (1-indexed).
    pub fn cancel_on_wait(mut self, n: usize) -> Self {
        self.cancel_on = Some(n);
        self
    }

    /// Every duration requested so far, in order.
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Number of waits requested.
    pub fn wait_count(&self) -> usize {
        self.waits.len()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration, token: &CancellationToken) -> bool {
        self.waits.push(duration);
        self.cancel_on == Some(self.waits.len()) || token.is_cancellation_requested()
    }
}

/// Assert that a retry outcome is `Ok`, optionally with a given value.
///
/// # Example
///
/// ```rust
/// use reprise::assert_retry_ok;
///
/// let result: Result<i32, reprise::RetryError> = Ok(7);
/// assert_retry_ok!(result.clone());
/// assert_retry_ok!(result, 7);
/// ```
#[macro_export]
macro_rules! assert_retry_ok {
    ($result:expr) => {
        match $result {
            Ok(_) => {}
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    };
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(value) => assert_eq!(value, $expected),
            Err(e) => panic!("Expected Ok({:?}), got Err: {}", $expected, e),
        }
    };
}

/// Assert that a retry outcome is [`RetryError::Cancelled`](crate::RetryError::Cancelled).
#[macro_export]
macro_rules! assert_retry_cancelled {
    ($result:expr) => {
        match $result {
            Err($crate::RetryError::Cancelled) => {}
            Err(e) => panic!("Expected cancellation, got Err: {}", e),
            Ok(v) => panic!("Expected cancellation, got Ok: {:?}", v),
        }
    };
}

/// Assert that a retry outcome is [`RetryError::Exhausted`](crate::RetryError::Exhausted)
/// after the given number of attempts.
#[macro_export]
macro_rules! assert_retry_exhausted {
    ($result:expr, $attempts:expr) => {
        match $result {
            Err($crate::RetryError::Exhausted { attempts }) => assert_eq!(attempts, $attempts),
            Err(e) => panic!("Expected exhaustion, got Err: {}", e),
            Ok(v) => panic!("Expected exhaustion, got Ok: {:?}", v),
        }
    };
}

/// Assert that a retry outcome is [`RetryError::Rejected`](crate::RetryError::Rejected)
/// whose description contains the given text.
#[macro_export]
macro_rules! assert_retry_rejected {
    ($result:expr, $needle:expr) => {
        match $result {
            Err($crate::RetryError::Rejected { description }) => assert!(
                description.contains($needle),
                "description {:?} does not contain {:?}",
                description,
                $needle
            ),
            Err(e) => panic!("Expected rejection, got Err: {}", e),
            Ok(v) => panic!("Expected rejection, got Ok: {:?}", v),
        }
    };
}
