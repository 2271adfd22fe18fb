//! Retry with exponential backoff, full jitter, and cooperative cancellation.
//!
//! The pieces:
//!
//! - **[`BackoffPolicy`]**: plain configuration plus a private generator; maps
//!   an attempt number to a randomized delay
//! - **[`interruptible_sleep`]**: a blocking wait that a [`CancellationToken`]
//!   can cut short
//! - **[`retry`] / [`Retry`]**: the control loop that invokes an operation,
//!   decides whether to retry, and waits in between
//!
//! # Quick Start
//!
//! ```rust
//! use reprise::{BackoffPolicy, Retry, RetryError};
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(8));
//!
//! let result: Result<u16, RetryError> = Retry::new(|| Err::<u16, _>("connection reset"))
//!     .with_max_attempts(3)
//!     .with_policy(policy)
//!     .run();
//!
//! assert_eq!(result, Err(RetryError::Exhausted { attempts: 3 }));
//! ```
//!
//! # Two retry predicates
//!
//! A returned value and a returned error are judged separately. The result
//! predicate sees every `Ok` (think "is this HTTP status retryable"), the error
//! predicate sees every `Err` (think "is this I/O error transient"). Exactly one
//! of them runs per attempt.
//!
//! # Cancellation
//!
//! ```rust
//! use reprise::{BackoffPolicy, CancellationSource, Retry, RetryError};
//! use std::time::Duration;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//!
//! let result = Retry::new(|| {
//!     source.cancel();
//!     Err::<(), _>("flaky")
//! })
//! .with_policy(BackoffPolicy::new(Duration::from_secs(30), 2.0, Duration::from_secs(60)))
//! .with_cancellation(token)
//! .run();
//!
//! assert_eq!(result, Err(RetryError::Cancelled));
//! ```

mod cancel;
mod error;
mod executor;
#[cfg(feature = "async")]
mod future;
mod policy;
mod sleep;

pub use cancel::{CancellationSource, CancellationToken};
pub use error::RetryError;
pub use executor::{retry, Retry, RetryCause, RetryEvent, DEFAULT_MAX_ATTEMPTS};
#[cfg(feature = "async")]
pub use future::{interruptible_sleep_async, retry_async};
pub use policy::BackoffPolicy;
pub use sleep::{interruptible_sleep, Sleeper, ThreadSleeper, SLEEP_INCREMENT};
