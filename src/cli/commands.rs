//! Streaming commands run by the binary.

use std::io::Write;
use std::sync::{Arc, Mutex};

use color_eyre::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::render::{render_message, Printer};
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::event_source::{EventSourceAdapter, EventSourceCallbacks};
use crate::retry::{with_retry_if, RetryPolicy};
use crate::session::{OpenStream, SessionOutcome, StreamCallbacks, StreamSession};
use crate::traits::HttpClient;

/// POST `payload` to `url` and print every message to `out`.
///
/// With `retry`, connection attempts that fail with a retryable error are
/// repeated per [`RetryPolicy::from_config`]. A failure after the stream
/// opened is never retried.
pub async fn stream_post<P, W>(
    client: Arc<dyn HttpClient>,
    config: &StreamConfig,
    url: &str,
    payload: &P,
    retry: bool,
    signal: &CancellationToken,
    out: W,
) -> Result<SessionOutcome>
where
    P: Serialize + ?Sized,
    W: Write + Send + 'static,
{
    let Some(open) = connect(client, config, url, payload, retry, signal).await? else {
        info!("Cancelled before the stream opened");
        return Ok(SessionOutcome::Aborted);
    };

    let printer = Arc::new(Mutex::new(Printer::new(out)));
    let sink = Arc::clone(&printer);
    let outcome = open
        .run(StreamCallbacks::new(move |message| {
            if let Ok(mut printer) = sink.lock() {
                if let Err(e) = printer.print(render_message(&message)) {
                    warn!("Failed to write output: {}", e);
                }
            }
        }))
        .await;

    finish_output(&printer);
    Ok(outcome)
}

async fn connect<P>(
    client: Arc<dyn HttpClient>,
    config: &StreamConfig,
    url: &str,
    payload: &P,
    retry: bool,
    signal: &CancellationToken,
) -> Result<Option<OpenStream>>
where
    P: Serialize + ?Sized,
{
    if !retry {
        let session = StreamSession::new(client, config.clone());
        return Ok(session.connect(url, payload, Some(signal.clone())).await?);
    }

    let policy = RetryPolicy::from_config(config);
    let opened = with_retry_if(
        move |attempt| {
            debug!(attempt, "Connecting");
            StreamSession::new(Arc::clone(&client), config.clone()).connect(
                url,
                payload,
                Some(signal.clone()),
            )
        },
        &policy,
        signal,
        StreamError::is_retryable,
    )
    .await?;

    Ok(opened.flatten())
}

/// Follow a GET event-source endpoint until it ends or `signal` is cancelled.
pub async fn subscribe<W>(
    config: &StreamConfig,
    url: &str,
    signal: &CancellationToken,
    out: W,
) -> Result<()>
where
    W: Write + Send + 'static,
{
    let printer = Arc::new(Mutex::new(Printer::new(out)));
    let sink = Arc::clone(&printer);

    let callbacks = EventSourceCallbacks::new(move |message| {
        if let Ok(mut printer) = sink.lock() {
            if let Err(e) = printer.print(render_message(&message)) {
                warn!("Failed to write output: {}", e);
            }
        }
    })
    .on_open(|| info!("Event source connected"))
    .on_parse_error(|message| {
        debug!(id = ?message.id, "Delivering undecodable frame as raw text")
    })
    .on_error(|err| error!(code = err.error_code(), "Event source failed: {}", err));

    let handle = EventSourceAdapter::new(config.clone()).open(url, callbacks, Some(signal.clone()))?;
    handle.join().await;

    finish_output(&printer);
    Ok(())
}

fn finish_output<W: Write>(printer: &Mutex<Printer<W>>) {
    if let Ok(mut printer) = printer.lock() {
        if let Err(e) = printer.end_line() {
            warn!("Failed to write output: {}", e);
        }
    }
}
