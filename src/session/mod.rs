//! Streaming POST sessions.
//!
//! A [`StreamSession`] issues one POST request with a JSON payload and reads
//! the `text/event-stream` response incrementally, delivering each frame as a
//! [`Message`] the moment its terminating blank line arrives.
//!
//! Sessions are single-use: [`StreamSession::start`] and
//! [`StreamSession::connect`] consume the session, so a second start on the
//! same instance cannot compile. Starting again means building a new session.
//!
//! # Cancellation
//!
//! Every entry point takes an optional [`CancellationToken`]. Cancelling it
//! before the request is issued skips the request entirely; cancelling it
//! while connecting or reading stops delivery within one read cycle, releases
//! the body and ends the session as [`SessionOutcome::Aborted`], which is not
//! an error.

mod callbacks;
mod reader;
mod state;

pub use callbacks::StreamCallbacks;
pub use state::{SessionOutcome, StreamState};

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::sse::Message;
use crate::traits::{ByteStream, HttpClient};

use reader::{FrameReader, ReadStep};

/// Upper bound on how much of an error response body is kept.
const MAX_ERROR_BODY: usize = 4096;

/// Items yielded by [`StreamSession::messages`].
pub type MessageItem = StreamResult<Message>;

/// One streaming request and its response lifecycle.
///
/// # Example
///
/// ```ignore
/// let session = StreamSession::new(Arc::new(ReqwestHttpClient::new()), config.clone());
/// let outcome = session
///     .start(
///         &config.chat_url(),
///         &ChatRequest::new("hello"),
///         StreamCallbacks::new(|msg| println!("{:?}", msg.json())),
///         None,
///     )
///     .await;
/// ```
pub struct StreamSession {
    client: Arc<dyn HttpClient>,
    config: StreamConfig,
    state_tx: watch::Sender<StreamState>,
}

impl StreamSession {
    pub fn new(client: Arc<dyn HttpClient>, config: StreamConfig) -> Self {
        let (state_tx, _) = watch::channel(StreamState::Idle);
        Self {
            client,
            config,
            state_tx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes. Take this before starting the session.
    pub fn state_receiver(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    /// Run the session to completion, driving `callbacks`.
    ///
    /// `on_message` runs for every frame in arrival order. When the body
    /// ends, or the signal is cancelled, `on_complete` runs; a transport
    /// failure runs `on_error` instead. Either way the body is released
    /// before the final callback.
    pub async fn start<P>(
        self,
        url: &str,
        payload: &P,
        callbacks: StreamCallbacks,
        signal: Option<CancellationToken>,
    ) -> SessionOutcome
    where
        P: Serialize + ?Sized,
    {
        let outcome = match self.connect(url, payload, signal).await {
            Ok(Some(open)) => return open.run(callbacks).await,
            Ok(None) => SessionOutcome::Aborted,
            Err(err) => SessionOutcome::Errored(err),
        };

        // connect() has already recorded the terminal state
        match &outcome {
            SessionOutcome::Errored(err) => callbacks.error(err.clone()),
            _ => callbacks.complete(),
        }
        outcome
    }

    /// Issue the request and wait for an accepted response head.
    ///
    /// Returns `Ok(None)` when the signal was cancelled before the response
    /// arrived. Errors here happen before any frame is delivered, which makes
    /// this the unit [`with_retry`](crate::retry::with_retry) repeats.
    pub async fn connect<P>(
        self,
        url: &str,
        payload: &P,
        signal: Option<CancellationToken>,
    ) -> StreamResult<Option<OpenStream>>
    where
        P: Serialize + ?Sized,
    {
        let signal = signal.unwrap_or_default();
        let body = serde_json::to_string(payload).map_err(StreamError::from);
        self.connect_with_body(url, body, signal).await
    }

    /// Run the session on a spawned task and receive messages over a channel.
    ///
    /// A transport failure arrives as a final `Err` item. The channel closes
    /// when the stream ends, is cancelled or fails. Dropping the receiver
    /// stops the task and releases the body.
    pub fn messages<P>(
        self,
        url: &str,
        payload: &P,
        signal: Option<CancellationToken>,
    ) -> mpsc::Receiver<MessageItem>
    where
        P: Serialize + ?Sized,
    {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let url = url.to_string();
        let body = serde_json::to_string(payload).map_err(StreamError::from);
        let signal = signal.unwrap_or_default();

        tokio::spawn(async move {
            match self.connect_with_body(&url, body, signal).await {
                Ok(Some(open)) => {
                    open.forward(tx).await;
                }
                Ok(None) => {}
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                }
            }
        });

        rx
    }

    async fn connect_with_body(
        self,
        url: &str,
        body: StreamResult<String>,
        signal: CancellationToken,
    ) -> StreamResult<Option<OpenStream>> {
        match self.establish(url, body, &signal).await {
            Ok(Some((status, body))) => {
                self.transition(StreamState::Open);
                debug!(url = %url, status, "Stream open");
                Ok(Some(OpenStream {
                    session: self,
                    reader: FrameReader::new(body),
                    signal,
                    status,
                }))
            }
            Ok(None) => {
                self.settle(&SessionOutcome::Aborted);
                Ok(None)
            }
            Err(err) => {
                self.settle(&SessionOutcome::Errored(err.clone()));
                Err(err)
            }
        }
    }

    async fn establish(
        &self,
        url: &str,
        body: StreamResult<String>,
        signal: &CancellationToken,
    ) -> StreamResult<Option<(u16, ByteStream)>> {
        let body = body?;

        if signal.is_cancelled() {
            debug!(url = %url, "Signal already cancelled; request not issued");
            return Ok(None);
        }

        self.transition(StreamState::Connecting);
        info!(url = %url, "Opening stream");

        let headers = self.config.request_headers();
        let response = tokio::select! {
            biased;
            _ = signal.cancelled() => return Ok(None),
            response = self.client.post_stream(url, &body, &headers) => response?,
        };

        let status = response.status;
        if !response.is_success() {
            let message = tokio::select! {
                biased;
                _ = signal.cancelled() => return Ok(None),
                message = read_error_message(response.body) => message,
            };
            return Err(StreamError::Transport { status, message });
        }

        match response.body {
            Some(body) => Ok(Some((status, body))),
            None => Err(StreamError::MissingBody { status }),
        }
    }

    fn transition(&self, next: StreamState) {
        let current = self.state();
        if current.is_terminal() {
            warn!(from = %current, to = %next, "Ignoring transition out of terminal state");
            return;
        }
        self.state_tx.send_replace(next);
    }

    fn settle(&self, outcome: &SessionOutcome) {
        self.transition(outcome.state());
        match outcome {
            SessionOutcome::Closed => info!("Stream closed"),
            SessionOutcome::Aborted => info!("Stream aborted"),
            SessionOutcome::Errored(err) => {
                error!(code = err.error_code(), "Stream failed: {}", err)
            }
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// A session whose response head was accepted and whose body is ready.
pub struct OpenStream {
    session: StreamSession,
    reader: FrameReader,
    signal: CancellationToken,
    status: u16,
}

impl OpenStream {
    /// HTTP status of the accepted response.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn state(&self) -> StreamState {
        self.session.state()
    }

    pub fn state_receiver(&self) -> watch::Receiver<StreamState> {
        self.session.state_receiver()
    }

    /// Read the body to the end, driving `callbacks`.
    pub async fn run(mut self, mut callbacks: StreamCallbacks) -> SessionOutcome {
        let outcome = loop {
            match self.reader.next_message(&self.signal).await {
                ReadStep::Message(message) => callbacks.message(message),
                ReadStep::End => break SessionOutcome::Closed,
                ReadStep::Aborted => break SessionOutcome::Aborted,
                ReadStep::Failed(err) => break SessionOutcome::Errored(err.into()),
            }
        };

        let OpenStream {
            session, reader, ..
        } = self;
        drop(reader);
        session.settle(&outcome);

        match &outcome {
            SessionOutcome::Errored(err) => callbacks.error(err.clone()),
            _ => callbacks.complete(),
        }
        outcome
    }

    /// Read the body on a spawned task, yielding messages over a channel.
    pub fn into_messages(self) -> mpsc::Receiver<MessageItem> {
        let (tx, rx) = mpsc::channel(self.session.config.channel_capacity.max(1));
        tokio::spawn(self.forward(tx));
        rx
    }

    async fn forward(mut self, tx: mpsc::Sender<MessageItem>) -> SessionOutcome {
        let outcome = loop {
            let step = tokio::select! {
                step = self.reader.next_message(&self.signal) => step,
                _ = tx.closed() => {
                    debug!("Message receiver dropped");
                    ReadStep::Aborted
                }
            };

            match step {
                ReadStep::Message(message) => {
                    let delivered = tokio::select! {
                        biased;
                        _ = self.signal.cancelled() => false,
                        sent = tx.send(Ok(message)) => sent.is_ok(),
                    };
                    if !delivered {
                        break SessionOutcome::Aborted;
                    }
                }
                ReadStep::End => break SessionOutcome::Closed,
                ReadStep::Aborted => break SessionOutcome::Aborted,
                ReadStep::Failed(err) => break SessionOutcome::Errored(err.into()),
            }
        };

        let OpenStream {
            session, reader, ..
        } = self;
        drop(reader);
        session.settle(&outcome);

        if let SessionOutcome::Errored(err) = &outcome {
            let _ = tx.send(Err(err.clone())).await;
        }
        outcome
    }
}

impl std::fmt::Debug for OpenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStream")
            .field("status", &self.status)
            .field("state", &self.state())
            .finish()
    }
}

async fn read_error_message(body: Option<ByteStream>) -> String {
    let Some(mut body) = body else {
        return "no response body".to_string();
    };

    let mut collected = Vec::new();
    while collected.len() < MAX_ERROR_BODY {
        match body.next().await {
            Some(Ok(bytes)) => collected.extend_from_slice(&bytes),
            _ => break,
        }
    }
    collected.truncate(MAX_ERROR_BODY);

    let text = String::from_utf8_lossy(&collected).trim().to_string();
    if text.is_empty() {
        "no response body".to_string()
    } else {
        text
    }
}
