//! Session lifecycle state.

use crate::error::StreamError;

/// Lifecycle of one streaming session.
///
/// `Idle -> Connecting -> Open -> {Closed | Aborted | Errored}`. Terminal
/// states never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, not started
    Idle,
    /// Request issued, response head not yet accepted
    Connecting,
    /// Reading the body
    Open,
    /// Body ended normally
    Closed,
    /// Cancelled by the caller
    Aborted,
    /// Unrecoverable transport failure
    Errored,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Closed | StreamState::Aborted | StreamState::Errored
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Connecting => "connecting",
            StreamState::Open => "open",
            StreamState::Closed => "closed",
            StreamState::Aborted => "aborted",
            StreamState::Errored => "errored",
        }
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// End of body reached, every frame delivered
    Closed,
    /// Caller cancelled; not a failure
    Aborted,
    /// Transport failure, already reported through `on_error`
    Errored(StreamError),
}

impl SessionOutcome {
    /// The terminal state matching this outcome.
    pub fn state(&self) -> StreamState {
        match self {
            SessionOutcome::Closed => StreamState::Closed,
            SessionOutcome::Aborted => StreamState::Aborted,
            SessionOutcome::Errored(_) => StreamState::Errored,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionOutcome::Aborted)
    }

    /// Collapse into a result; cancellation counts as success.
    pub fn into_result(self) -> Result<(), StreamError> {
        match self {
            SessionOutcome::Closed | SessionOutcome::Aborted => Ok(()),
            SessionOutcome::Errored(err) => Err(err),
        }
    }
}
