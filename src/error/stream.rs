//! Streaming error types.
//!
//! Only connection-level faults are errors. A frame that fails JSON decoding
//! is delivered as a raw message, and cancellation ends a session as
//! `Aborted`; neither produces a [`StreamError`].

use thiserror::Error;

use crate::traits::HttpError;

/// Fatal failure of one streaming session.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Server answered with a non-success status.
    #[error("Stream request failed with status {status}: {message}")]
    Transport { status: u16, message: String },

    /// Successful status but nothing readable to stream.
    #[error("Stream response (status {status}) has no readable body")]
    MissingBody { status: u16 },

    /// Request could not be issued, or the body failed mid-read.
    #[error("Stream connection error: {0}")]
    Connection(#[from] HttpError),

    /// Request could not be built (bad URL, unserializable payload).
    #[error("Invalid stream request: {0}")]
    InvalidRequest(String),
}

impl StreamError {
    /// Whether a fresh connection attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            StreamError::MissingBody { .. } => false,
            StreamError::Connection(err) => !matches!(err, HttpError::InvalidUrl(_)),
            StreamError::InvalidRequest(_) => false,
        }
    }

    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Transport { .. } => "E_STREAM_STATUS",
            StreamError::MissingBody { .. } => "E_STREAM_NO_BODY",
            StreamError::Connection(_) => "E_STREAM_CONN",
            StreamError::InvalidRequest(_) => "E_STREAM_REQUEST",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StreamError::Transport { status, .. } | StreamError::MissingBody { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::InvalidRequest(err.to_string())
    }
}
