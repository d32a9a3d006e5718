//! Mock HTTP transport for testing.
//!
//! Provides a configurable mock that returns scripted chunk sequences,
//! records requests, and counts how often a handed-out body was released.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, StreamResponse};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: String,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with the given chunks, then end of body
    Stream(Vec<Bytes>),
    /// 200 with the given chunks, then a read error
    StreamThenError(Vec<Bytes>, HttpError),
    /// 200 with the given chunks, then a body that never ends
    Pending(Vec<Bytes>),
    /// Arbitrary status with a (possibly empty) body
    Status(u16, Vec<Bytes>),
    /// Status with no readable body
    NoBody(u16),
    /// The request itself fails
    Error(HttpError),
}

impl MockResponse {
    /// Convenience for a 200 stream built from string chunks.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(chunks.into_iter().map(|c| Bytes::from(c.into())).collect())
    }
}

/// Body wrapper that counts its own drop.
struct TrackedBody {
    inner: ByteStream,
    releases: Arc<AtomicUsize>,
}

impl Stream for TrackedBody {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock HTTP transport for testing.
///
/// Responses are looked up by exact URL, then by URL prefix, then the
/// default. Queued responses for a URL take precedence and are consumed
/// in order, which allows scripting "fail, fail, succeed" sequences.
///
/// # Example
///
/// ```ignore
/// use agentj_stream::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "http://test/stream",
///     MockResponse::chunks(["data: {\"x\":1}\n", "\n"]),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Configured responses by URL pattern
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// One-shot responses consumed before `responses`
    queued: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Bodies handed out
    opened: Arc<AtomicUsize>,
    /// Bodies dropped
    releases: Arc<AtomicUsize>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a specific URL (exact or prefix match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Queue a one-shot response for a URL.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut queued = self.queued.lock().unwrap();
        queued.entry(url.to_string()).or_default().push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of response bodies handed out.
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of response bodies dropped by their reader.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn record_request(&self, url: &str, headers: &Headers, body: &str) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
            body: body.to_string(),
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        if let Some(queue) = self.queued.lock().unwrap().get_mut(url) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }

        let responses = self.responses.lock().unwrap();

        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        for (pattern, response) in responses.iter() {
            if url.starts_with(pattern) {
                return Some(response.clone());
            }
        }

        self.default_response.lock().unwrap().clone()
    }

    fn track(&self, inner: ByteStream) -> ByteStream {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::pin(TrackedBody {
            inner,
            releases: Arc::clone(&self.releases),
        })
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<StreamResponse, HttpError> {
        self.record_request(url, headers, body);

        let response = self
            .get_response(url)
            .ok_or_else(|| HttpError::Other(format!("No mock response for URL: {}", url)))?;

        let response = match response {
            MockResponse::Stream(chunks) => {
                let body = futures::stream::iter(chunks.into_iter().map(Ok));
                StreamResponse::new(200, self.track(Box::pin(body)))
            }
            MockResponse::StreamThenError(chunks, err) => {
                let body = futures::stream::iter(
                    chunks
                        .into_iter()
                        .map(Ok)
                        .chain(std::iter::once(Err(err))),
                );
                StreamResponse::new(200, self.track(Box::pin(body)))
            }
            MockResponse::Pending(chunks) => {
                let body = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending());
                StreamResponse::new(200, self.track(Box::pin(body)))
            }
            MockResponse::Status(status, chunks) => {
                let body = futures::stream::iter(chunks.into_iter().map(Ok));
                StreamResponse::new(status, self.track(Box::pin(body)))
            }
            MockResponse::NoBody(status) => StreamResponse::empty(status),
            MockResponse::Error(err) => return Err(err),
        };

        Ok(response)
    }
}
