//! Error types for the streaming client.
//!
//! | Condition | Type | Reported via |
//! |-----------|------|--------------|
//! | Non-2xx status, missing body, connection fault | [`StreamError`] | `on_error`, [`SessionOutcome::Errored`] |
//! | Malformed JSON in one frame | none, delivered as `MessageBody::Raw` | `on_message` |
//! | Caller cancellation | none | `on_complete`, [`SessionOutcome::Aborted`] |
//! | All retry attempts failed | [`RetryError::Exhausted`] | `with_retry` result |
//!
//! [`SessionOutcome::Errored`]: crate::session::SessionOutcome::Errored
//! [`SessionOutcome::Aborted`]: crate::session::SessionOutcome::Aborted

mod retry;
mod stream;

pub use crate::traits::HttpError;
pub use retry::RetryError;
pub use stream::StreamError;

/// Result alias for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
