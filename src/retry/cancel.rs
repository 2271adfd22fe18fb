//! Cooperative cancellation: a source that requests, tokens that observe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner side of a cancellation pair.
///
/// Hand out [`CancellationToken`]s with [`token`](Self::token) and call
/// [`cancel`](Self::cancel) from any thread to signal every token at once.
///
/// # Examples
///
/// ```rust
/// use reprise::CancellationSource;
///
/// let source = CancellationSource::new();
/// let token = source.token();
/// assert!(!token.is_cancellation_requested());
///
/// source.cancel();
/// source.cancel(); // idempotent
/// assert!(token.is_cancellation_requested());
/// ```
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    /// Create a source in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token observing this source.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Some(Arc::clone(&self.flag)),
        }
    }

    /// Request cancellation. Safe to call repeatedly and after the retry
    /// sequence has already finished.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Read-only view of a [`CancellationSource`].
///
/// A token created with [`none`](Self::none) (also the `Default`) is not tied
/// to any source: cancellation is impossible and waits run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// A token that can never be cancelled.
    pub fn none() -> Self {
        Self { flag: None }
    }

    /// Whether the associated source has requested cancellation.
    pub fn is_cancellation_requested(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Whether this token is tied to a source at all.
    pub fn can_be_cancelled(&self) -> bool {
        self.flag.is_some()
    }
}
