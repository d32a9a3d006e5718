//! Common test utilities for integration tests.
//!
//! Helpers shared by the transport, session and event-source tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use agentj_stream::session::StreamCallbacks;
use agentj_stream::sse::Message;

/// Messages captured by [`collecting_callbacks`].
pub type Collected = Arc<Mutex<Vec<Message>>>;

/// Callbacks that push every message into a shared vector.
pub fn collecting_callbacks() -> (StreamCallbacks, Collected) {
    let collected: Collected = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&collected);
    let callbacks = StreamCallbacks::new(move |message| sink.lock().unwrap().push(message));
    (callbacks, collected)
}

/// Typical chat stream as the agent backend emits it.
pub fn chat_stream_body() -> String {
    [
        r#"data: {"type":"start","conversationId":"conv-1"}"#,
        "",
        r#"data: {"type":"chunk","content":"Hello, "}"#,
        "",
        r#"data: {"type":"chunk","content":"wörld ✓"}"#,
        "",
        r#"data: {"type":"done"}"#,
        "",
        "",
    ]
    .join("\n")
}
