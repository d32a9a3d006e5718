//! GET-only event-source transport.
//!
//! Wraps `eventsource-client` for endpoints that do not need a request body.
//! Received events go through the same [`parse_message`] as POST sessions, so
//! both transports agree on field handling. The library's own reconnection is
//! disabled unless [`StreamConfig::event_source_reconnect`] is set; this module
//! never reconnects on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventsource_client as es;
use es::Client;
use futures::Stream;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::sse::{parse_message, Frame, Message};
use crate::traits::HttpError;

/// Event type the library reports when the server sent no `event:` field.
const DEFAULT_EVENT_TYPE: &str = "message";

type MessageFn = Box<dyn FnMut(Message) + Send>;
type ParseErrorFn = Box<dyn FnMut(&Message) + Send>;
type ErrorFn = Box<dyn FnMut(StreamError) + Send>;
type OpenFn = Box<dyn FnOnce() + Send>;

/// Callbacks for an event-source connection.
///
/// `on_parse_error` runs for each frame whose data was not valid JSON, just
/// before that frame reaches `on_message`. `on_error` runs for connection
/// failures; with reconnection enabled it can run more than once.
pub struct EventSourceCallbacks {
    on_message: MessageFn,
    on_parse_error: Option<ParseErrorFn>,
    on_error: Option<ErrorFn>,
    on_open: Option<OpenFn>,
}

impl EventSourceCallbacks {
    pub fn new(on_message: impl FnMut(Message) + Send + 'static) -> Self {
        Self {
            on_message: Box::new(on_message),
            on_parse_error: None,
            on_error: None,
            on_open: None,
        }
    }

    pub fn on_parse_error(mut self, f: impl FnMut(&Message) + Send + 'static) -> Self {
        self.on_parse_error = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(StreamError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Runs once, when the first event or comment arrives.
    pub fn on_open(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    fn deliver(&mut self, message: Message) {
        if message.is_parse_error() {
            if let Some(on_parse_error) = self.on_parse_error.as_mut() {
                on_parse_error(&message);
            }
        }
        (self.on_message)(message);
    }

    fn error(&mut self, err: StreamError) {
        if let Some(on_error) = self.on_error.as_mut() {
            on_error(err);
        }
    }

    fn open(&mut self) {
        if let Some(on_open) = self.on_open.take() {
            on_open();
        }
    }
}

/// Opens event-source connections.
#[derive(Debug, Clone, Default)]
pub struct EventSourceAdapter {
    config: StreamConfig,
}

impl EventSourceAdapter {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Connect to `url` and deliver events on a spawned task.
    ///
    /// Cancelling `signal` or calling [`EventSourceHandle::close`] closes the
    /// connection. Fails only if the URL or headers are unusable; connection
    /// failures go to `on_error`.
    pub fn open(
        &self,
        url: &str,
        callbacks: EventSourceCallbacks,
        signal: Option<CancellationToken>,
    ) -> Result<EventSourceHandle, StreamError> {
        let client = self.build_client(url)?;
        let token = signal.unwrap_or_default().child_token();
        let closed = Arc::new(AtomicBool::new(false));

        info!(url = %url, reconnect = self.config.event_source_reconnect, "Opening event source");

        let task = tokio::spawn(drive(
            client.stream(),
            callbacks,
            token.clone(),
            Arc::clone(&closed),
            self.config.event_source_reconnect,
        ));

        Ok(EventSourceHandle {
            token,
            closed,
            task: Some(task),
        })
    }

    fn build_client(&self, url: &str) -> Result<impl es::Client, StreamError> {
        let mut builder = es::ClientBuilder::for_url(url)
            .map_err(|e| StreamError::InvalidRequest(format!("{:?}", e)))?;

        if let Some(token) = &self.config.auth_token {
            builder = builder
                .header("Authorization", &format!("Bearer {}", token))
                .map_err(|e| StreamError::InvalidRequest(format!("{:?}", e)))?;
        }

        let reconnect = if self.config.event_source_reconnect {
            es::ReconnectOptions::reconnect(true)
                .retry_initial(false)
                .delay(self.config.retry_delay)
                .backoff_factor(2)
                .delay_max(Duration::from_secs(60))
                .build()
        } else {
            es::ReconnectOptions::reconnect(false).build()
        };

        Ok(builder.reconnect(reconnect).build())
    }
}

/// Handle to a running event-source connection.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct EventSourceHandle {
    token: CancellationToken,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl EventSourceHandle {
    /// Request the connection to close. Safe to call any number of times.
    pub fn close(&self) {
        if !self.token.is_cancelled() {
            debug!("Event source close requested");
        }
        self.token.cancel();
    }

    /// Whether the connection has been released.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the connection to finish, after which it is released.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Event source task failed: {}", e);
            }
        }
    }
}

impl Drop for EventSourceHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn drive<S>(
    mut stream: S,
    mut callbacks: EventSourceCallbacks,
    token: CancellationToken,
    closed: Arc<AtomicBool>,
    reconnect: bool,
) where
    S: Stream<Item = Result<es::SSE, es::Error>> + Unpin,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Event source cancelled");
                break;
            }
            item = stream.next() => item,
        };

        match item {
            Some(Ok(es::SSE::Event(event))) => {
                callbacks.open();
                let frame = frame_from_parts(event.event_type, event.data, event.id);
                callbacks.deliver(parse_message(frame));
            }
            Some(Ok(es::SSE::Comment(comment))) => {
                callbacks.open();
                debug!(comment = %comment, "Event source comment");
            }
            Some(Err(es::Error::Eof)) | None => {
                debug!("Event source ended");
                break;
            }
            Some(Err(err)) => {
                warn!("Event source error: {:?}", err);
                callbacks.error(StreamError::Connection(HttpError::Other(format!(
                    "{:?}",
                    err
                ))));
                if !reconnect {
                    break;
                }
            }
        }

        if token.is_cancelled() {
            break;
        }
    }

    drop(stream);
    release_once(&closed);
}

/// Mark the connection released; only the first call logs.
fn release_once(closed: &AtomicBool) -> bool {
    let first = !closed.swap(true, Ordering::SeqCst);
    if first {
        info!("Event source closed");
    }
    first
}

/// The library already joins `data:` lines with `\n` and drops the final
/// separator, so `data` is used as is.
fn frame_from_parts(event_type: String, data: String, id: Option<String>) -> Frame {
    Frame {
        event: Some(event_type).filter(|t| t != DEFAULT_EVENT_TYPE),
        id,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_release_once() {
        let closed = AtomicBool::new(false);
        assert!(release_once(&closed));
        assert!(!release_once(&closed));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_frame_from_parts_maps_fields() {
        let frame = frame_from_parts(
            "update".to_string(),
            "{\"planId\":\"p1\"}".to_string(),
            Some("9".to_string()),
        );
        let message = parse_message(frame);
        assert_eq!(message.event.as_deref(), Some("update"));
        assert_eq!(message.id.as_deref(), Some("9"));
        assert_eq!(message.json(), Some(&json!({"planId": "p1"})));
    }

    #[test]
    fn test_trailing_empty_data_line_kept() {
        let frame = frame_from_parts(DEFAULT_EVENT_TYPE.to_string(), "line1\n".to_string(), None);
        assert_eq!(frame.data, "line1\n");
        assert_eq!(parse_message(frame).raw_text(), Some("line1\n"));
    }

    #[test]
    fn test_default_event_type_is_unnamed() {
        let frame = frame_from_parts(DEFAULT_EVENT_TYPE.to_string(), "1".to_string(), None);
        assert_eq!(frame.event, None);
        assert_eq!(frame.data, "1");
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let adapter = EventSourceAdapter::default();
        let result = adapter.open("not a url", EventSourceCallbacks::new(|_| {}), None);
        assert!(matches!(result, Err(StreamError::InvalidRequest(_))));
    }
}
