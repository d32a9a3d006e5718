//! Typed views of agent backend payloads.
//!
//! The backend sends JSON objects tagged by `type` in its `data:` lines.
//! These types are an optional convenience over [`Message::decode`]; the
//! stream itself never routes on them.
//!
//! [`Message::decode`]: super::Message::decode

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress snapshot sent by the task stream (`update` and `done`).
///
/// The chat stream's `done` carries no fields, so every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskProgress {
    pub plan_id: Option<String>,
    pub status: Option<Value>,
    pub detail: Option<Value>,
    pub completed: Option<bool>,
    pub running: Option<bool>,
}

/// Events emitted by the chat and task streaming endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Chat stream opened for a conversation
    Start {
        #[serde(rename = "conversationId", default)]
        conversation_id: Option<String>,
    },
    /// Incremental model output
    Chunk {
        #[serde(default)]
        content: String,
    },
    /// Task still running
    Update(TaskProgress),
    /// Stream finished
    Done(TaskProgress),
    /// Backend-side failure reported in-band
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(rename = "planId", default)]
        plan_id: Option<String>,
    },
}

impl AgentEvent {
    /// Whether this event ends the logical exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done(_) | AgentEvent::Error { .. })
    }

    /// The text carried by a `chunk` event.
    pub fn chunk_text(&self) -> Option<&str> {
        match self {
            AgentEvent::Chunk { content } => Some(content),
            _ => None,
        }
    }
}

/// Body of a chat streaming request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ChatRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            conversation_id: None,
            user_id: None,
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }
}

/// Body of a task progress streaming request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStreamRequest {
    pub plan_id: String,
}

impl TaskStreamRequest {
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::{parse_message, Frame};
    use serde_json::json;

    fn decode(data: &str) -> AgentEvent {
        parse_message(Frame::data(data)).decode().unwrap()
    }

    #[test]
    fn test_chat_start() {
        assert_eq!(
            decode(r#"{"type":"start","conversationId":"c-1"}"#),
            AgentEvent::Start {
                conversation_id: Some("c-1".to_string())
            }
        );
    }

    #[test]
    fn test_chat_chunk() {
        let event = decode(r#"{"type":"chunk","content":"你好"}"#);
        assert_eq!(event.chunk_text(), Some("你好"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_chat_done_without_fields() {
        let event = decode(r#"{"type":"done"}"#);
        assert_eq!(event, AgentEvent::Done(TaskProgress::default()));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_task_update() {
        let event = decode(
            r#"{"type":"update","planId":"p-9","status":{"isRunning":true},"detail":null,"completed":false,"running":true}"#,
        );
        match event {
            AgentEvent::Update(progress) => {
                assert_eq!(progress.plan_id.as_deref(), Some("p-9"));
                assert_eq!(progress.status, Some(json!({"isRunning": true})));
                assert_eq!(progress.detail, None);
                assert_eq!(progress.completed, Some(false));
                assert_eq!(progress.running, Some(true));
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_error_event() {
        let event = decode(r#"{"type":"error","planId":"p-1","message":"boom"}"#);
        assert_eq!(
            event,
            AgentEvent::Error {
                message: Some("boom".to_string()),
                plan_id: Some("p-1".to_string()),
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_request_bodies_use_backend_field_names() {
        let chat = ChatRequest::new("hi").with_conversation("c-1");
        assert_eq!(
            serde_json::to_value(&chat).unwrap(),
            json!({"input": "hi", "conversationId": "c-1"})
        );

        let chat = ChatRequest::new("hi").with_user("u-7");
        assert_eq!(
            serde_json::to_value(&chat).unwrap(),
            json!({"input": "hi", "userId": "u-7"})
        );

        let task = TaskStreamRequest::new("p-3");
        assert_eq!(serde_json::to_value(&task).unwrap(), json!({"planId": "p-3"}));
    }

    #[test]
    fn test_unknown_type_fails_to_decode() {
        let msg = parse_message(Frame::data(r#"{"type":"mystery"}"#));
        assert!(msg.decode::<AgentEvent>().is_err());
    }
}
