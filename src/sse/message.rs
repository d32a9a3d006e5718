//! Frame payload decoding.
//!
//! Every frame becomes a [`Message`]. A frame whose data is not valid JSON is
//! still delivered, carrying the raw text and the parse error, so one bad
//! frame never ends the stream.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::frame::Frame;

/// Decoded frame payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// Data decoded as JSON
    Json { value: Value },
    /// Data that failed JSON decoding, kept verbatim
    Raw { text: String, parse_error: String },
}

/// A parsed frame, handed to the caller in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    /// The JSON value, if the data decoded.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            MessageBody::Json { value } => Some(value),
            MessageBody::Raw { .. } => None,
        }
    }

    /// The undecodable text, if the data did not decode.
    pub fn raw_text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Raw { text, .. } => Some(text),
            MessageBody::Json { .. } => None,
        }
    }

    /// Whether JSON decoding failed for this frame.
    pub fn is_parse_error(&self) -> bool {
        matches!(self.body, MessageBody::Raw { .. })
    }

    /// The `type` field of a JSON object payload.
    pub fn kind(&self) -> Option<&str> {
        self.json()?.get("type")?.as_str()
    }

    /// Deserialize the payload into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            MessageBody::Json { value } => T::deserialize(value),
            MessageBody::Raw { text, .. } => serde_json::from_str(text),
        }
    }
}

/// Turn a frame into a message; `event` and `id` pass through unchanged.
pub fn parse_message(frame: Frame) -> Message {
    let Frame { event, id, data } = frame;

    let body = match serde_json::from_str::<Value>(&data) {
        Ok(value) => MessageBody::Json { value },
        Err(e) => {
            warn!(
                event = event.as_deref().unwrap_or("message"),
                error = %e,
                "Frame data is not valid JSON, delivering raw text"
            );
            MessageBody::Raw {
                text: data,
                parse_error: e.to_string(),
            }
        }
    };

    Message { event, id, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_parse_json_frame() {
        let msg = parse_message(Frame::data(r#"{"x":1}"#));
        assert_eq!(msg.json(), Some(&json!({"x": 1})));
        assert!(!msg.is_parse_error());
        assert!(msg.event.is_none());
        assert!(msg.id.is_none());
    }

    #[test]
    fn test_parse_scalar_json() {
        let msg = parse_message(Frame::data("42"));
        assert_eq!(msg.json(), Some(&json!(42)));
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let msg = parse_message(Frame::data("not json").with_event("chunk"));
        assert!(msg.is_parse_error());
        assert_eq!(msg.raw_text(), Some("not json"));
        assert_eq!(msg.event.as_deref(), Some("chunk"));
        match &msg.body {
            MessageBody::Raw { parse_error, .. } => assert!(!parse_error.is_empty()),
            _ => panic!("Expected Raw body"),
        }
    }

    #[test]
    fn test_event_and_id_pass_through() {
        let msg = parse_message(Frame::data("{}").with_event("done").with_id("abc"));
        assert_eq!(msg.event.as_deref(), Some("done"));
        assert_eq!(msg.id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_kind_reads_type_field() {
        let msg = parse_message(Frame::data(r#"{"type":"chunk","content":"hi"}"#));
        assert_eq!(msg.kind(), Some("chunk"));
        assert_eq!(parse_message(Frame::data("[1]")).kind(), None);
    }

    #[test]
    fn test_decode_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Point {
            x: i32,
        }

        let msg = parse_message(Frame::data(r#"{"x":5}"#));
        assert_eq!(msg.decode::<Point>().unwrap(), Point { x: 5 });

        let bad = parse_message(Frame::data("{oops"));
        assert!(bad.decode::<Point>().is_err());
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let msg = parse_message(Frame::data(r#"{"x":1}"#).with_id("1"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"id": "1", "kind": "json", "value": {"x": 1}}));

        let raw = parse_message(Frame::data("nope"));
        let value = serde_json::to_value(&raw).unwrap();
        assert_eq!(value["kind"], "raw");
        assert_eq!(value["text"], "nope");
        assert!(value["parse_error"].is_string());
    }
}
