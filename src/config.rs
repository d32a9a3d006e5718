//! Streaming client configuration.
//!
//! Use the builder methods to customize, or [`StreamConfig::from_env`] to
//! read overrides from the environment.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::traits::Headers;

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Path of the chat streaming endpoint.
pub const CHAT_PATH: &str = "/api/executor/chat";

/// Path of the task progress streaming endpoint.
pub const TASK_STREAM_PATH: &str = "/api/executor/taskStream";

/// Configuration shared by sessions, the event-source adapter and retries.
///
/// # Example
///
/// ```ignore
/// use agentj_stream::config::StreamConfig;
///
/// let config = StreamConfig::default()
///     .with_base_url("http://agent.internal:8080")
///     .with_max_retries(5);
/// ```
#[derive(Clone)]
pub struct StreamConfig {
    /// Backend base URL (default: http://localhost:8080)
    pub base_url: String,
    /// Bearer token attached to every request, supplied by the caller
    pub auth_token: Option<String>,
    /// Bound on connection establishment; the body is never timed out
    pub connect_timeout: Duration,
    /// Attempts made by `with_retry` (default: 3)
    pub max_retries: usize,
    /// Wait between attempts (default: 1s)
    pub retry_delay: Duration,
    /// Keep the event-source primitive's own reconnection (default: false)
    pub event_source_reconnect: bool,
    /// Buffer size of the channel returned by `StreamSession::messages`
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(20),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            event_source_reconnect: false,
            channel_capacity: 64,
        }
    }
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("event_source_reconnect", &self.event_source_reconnect)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl StreamConfig {
    /// Create a new StreamConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_event_source_reconnect(mut self, reconnect: bool) -> Self {
        self.event_source_reconnect = reconnect;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Build config from the environment, falling back to defaults.
    ///
    /// - `AGENTJ_API_BASE_URL`
    /// - `AGENTJ_TOKEN`
    /// - `AGENTJ_CONNECT_TIMEOUT_MS`
    /// - `AGENTJ_MAX_RETRIES`
    /// - `AGENTJ_RETRY_DELAY_MS`
    /// - `AGENTJ_EVENT_SOURCE_RECONNECT` (`1`/`true`)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("AGENTJ_API_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let auth_token = std::env::var("AGENTJ_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let connect_timeout = Duration::from_millis(env_parse(
            "AGENTJ_CONNECT_TIMEOUT_MS",
            defaults.connect_timeout.as_millis() as u64,
        ));
        let max_retries = env_parse("AGENTJ_MAX_RETRIES", defaults.max_retries);
        let retry_delay = Duration::from_millis(env_parse(
            "AGENTJ_RETRY_DELAY_MS",
            defaults.retry_delay.as_millis() as u64,
        ));
        let event_source_reconnect = std::env::var("AGENTJ_EVENT_SOURCE_RECONNECT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.event_source_reconnect);

        Self {
            base_url,
            auth_token,
            connect_timeout,
            max_retries,
            retry_delay,
            event_source_reconnect,
            channel_capacity: defaults.channel_capacity,
        }
    }

    /// Resolve a path against the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// URL of the chat streaming endpoint.
    pub fn chat_url(&self) -> String {
        self.endpoint(CHAT_PATH)
    }

    /// URL of the task progress streaming endpoint.
    pub fn task_stream_url(&self) -> String {
        self.endpoint(TASK_STREAM_PATH)
    }

    /// Headers for a streaming POST request.
    pub fn request_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        if let Some(token) = &self.auth_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(variable = name, value = %raw, "Ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}
