//! Error type for retry sequences that did not end in success.

use std::fmt;

/// Why a retry sequence failed.
///
/// Every variant renders a distinct, non-empty message through `Display`, so
/// callers that only log the message can still tell the three causes apart.
///
/// # Examples
///
/// ```rust
/// use reprise::RetryError;
///
/// let err = RetryError::Exhausted { attempts: 3 };
/// assert_eq!(err.to_string(), "retry failed after 3 attempts");
/// assert_eq!(err.attempts(), Some(3));
///
/// let err = RetryError::rejected("connection refused");
/// assert_eq!(err.to_string(), "retry failed with error: connection refused");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Cancellation was observed while waiting between attempts.
    Cancelled,
    /// The operation failed with an error the error predicate refused to retry.
    Rejected {
        /// `Display` rendering of the rejected error.
        description: String,
    },
    /// Every permitted attempt was used without an accepted result.
    Exhausted {
        /// The configured attempt budget.
        attempts: u32,
    },
}

impl RetryError {
    /// Build a [`RetryError::Rejected`] from any displayable error.
    pub fn rejected(error: impl fmt::Display) -> Self {
        Self::Rejected {
            description: error.to_string(),
        }
    }

    /// The human-readable failure message.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if the sequence was cancelled during backoff.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if a non-retryable error ended the sequence.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// The attempt budget, for [`RetryError::Exhausted`] only.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts } => Some(*attempts),
            _ => None,
        }
    }

    /// The rejected error's description, for [`RetryError::Rejected`] only.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Rejected { description } => Some(description),
            _ => None,
        }
    }
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "retry operation was cancelled during backoff"),
            Self::Rejected { description } => write!(f, "retry failed with error: {}", description),
            Self::Exhausted { attempts } => write!(f, "retry failed after {} attempts", attempts),
        }
    }
}

impl std::error::Error for RetryError {}
