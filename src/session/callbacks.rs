//! Caller-supplied notification hooks for a streaming session.

use crate::error::StreamError;
use crate::sse::Message;

type MessageFn = Box<dyn FnMut(Message) + Send>;
type ErrorFn = Box<dyn FnOnce(StreamError) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;

/// Callbacks driven by [`StreamSession::start`](super::StreamSession::start).
///
/// `on_message` runs once per frame in arrival order. Exactly one of
/// `on_complete` (end of body or cancellation) and `on_error` (transport
/// failure) runs when the session ends.
///
/// # Example
///
/// ```ignore
/// let callbacks = StreamCallbacks::new(|msg| println!("{:?}", msg.json()))
///     .on_error(|err| eprintln!("stream failed: {}", err))
///     .on_complete(|| println!("done"));
/// ```
pub struct StreamCallbacks {
    on_message: MessageFn,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl StreamCallbacks {
    pub fn new(on_message: impl FnMut(Message) + Send + 'static) -> Self {
        Self {
            on_message: Box::new(on_message),
            on_error: None,
            on_complete: None,
        }
    }

    pub fn on_error(mut self, on_error: impl FnOnce(StreamError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn on_complete(mut self, on_complete: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    pub(crate) fn message(&mut self, message: Message) {
        (self.on_message)(message);
    }

    pub(crate) fn error(self, err: StreamError) {
        if let Some(on_error) = self.on_error {
            on_error(err);
        }
    }

    pub(crate) fn complete(self) {
        if let Some(on_complete) = self.on_complete {
            on_complete();
        }
    }
}

impl std::fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}
