//! Retry error types.

use thiserror::Error;

/// Failure of a retried operation, distinct from the underlying error of
/// any single attempt.
#[derive(Debug, Clone, Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: usize, last_error: E },

    /// An attempt failed with an error the retry predicate rejected.
    #[error("Attempt {attempts} failed with a non-retryable error: {last_error}")]
    NotRetryable { attempts: usize, last_error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::NotRetryable { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The error returned by the final attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. }
            | RetryError::NotRetryable { last_error, .. } => last_error,
        }
    }

    /// Unwrap into the final attempt's error.
    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. }
            | RetryError::NotRetryable { last_error, .. } => last_error,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}
