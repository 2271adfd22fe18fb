//! # Reprise
//!
//! > *Try it again, a little later, a little differently.*
//!
//! A small library for retrying fallible operations with randomized
//! exponential backoff.
//!
//! ## Philosophy
//!
//! - **Policy is data**: [`BackoffPolicy`] is three numbers and a private
//!   random generator. It never sleeps and never calls anything.
//! - **The loop is the shell**: [`retry`] and [`Retry`] invoke the operation,
//!   consult two predicates and wait between attempts.
//! - **No exceptions escape**: every exit path is a value, either the
//!   operation's success or a [`RetryError`] with a readable message.
//!
//! ## Quick Example
//!
//! ```rust
//! use reprise::{BackoffPolicy, Retry};
//! use std::time::Duration;
//!
//! let mut responses = vec![200, 503, 429].into_iter();
//!
//! let status = Retry::new(|| responses.next_back().ok_or("no more responses"))
//!     .with_policy(BackoffPolicy::new(Duration::from_millis(1), 2.0, Duration::from_millis(10)))
//!     .retry_if_result(|status| *status == 429 || *status >= 500)
//!     .run();
//!
//! assert_eq!(status, Ok(200));
//! ```
//!
//! ## Features
//!
//! - `async`: [`retry_async`] on the tokio timer
//! - `tracing`: log retries, rejections, exhaustion and cancellation
//! - `serde`: (de)serialize [`BackoffPolicy`] configuration

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;
pub mod testing;

// Re-exports
pub use retry::{
    interruptible_sleep, retry, BackoffPolicy, CancellationSource, CancellationToken, Retry,
    RetryCause, RetryError, RetryEvent, Sleeper, ThreadSleeper,
};
#[cfg(feature = "async")]
pub use retry::{interruptible_sleep_async, retry_async};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::{
        retry, BackoffPolicy, CancellationSource, CancellationToken, Retry, RetryError,
    };
}
