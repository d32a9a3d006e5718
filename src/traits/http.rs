//! HTTP transport trait abstraction.
//!
//! Provides a trait-based abstraction over the streaming POST request,
//! enabling dependency injection and mocking in tests. The transport only
//! moves bytes; interpreting the status and the presence of a body is left
//! to [`StreamSession`](crate::session::StreamSession).

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Incrementally readable response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Response head plus the not-yet-read body.
pub struct StreamResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    pub headers: Headers,
    /// Body reader, `None` when the response carries no readable body
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    /// Create a response with a body.
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Some(body),
        }
    }

    /// Create a response without a body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Attach headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// IO error while reading the body
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for the streaming HTTP transport.
///
/// # Example
///
/// ```ignore
/// use agentj_stream::traits::{HttpClient, Headers};
///
/// async fn status<C: HttpClient>(client: &C) -> Result<u16, HttpError> {
///     let response = client.post_stream("http://localhost:8080/api/executor/chat", "{}", &Headers::new()).await?;
///     Ok(response.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a POST request and return the response with its body unread.
    ///
    /// # Arguments
    /// * `url` - The URL to request
    /// * `body` - Request body as a string
    /// * `headers` - Request headers
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<StreamResponse, HttpError>;
}
