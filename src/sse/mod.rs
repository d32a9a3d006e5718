//! Server-Sent Events decoding.
//!
//! A response body flows through three stages:
//! - [`LineDecoder`] turns arbitrary byte chunks into complete text lines,
//!   carrying partial UTF-8 sequences and partial lines across chunks
//! - [`FrameAssembler`] groups lines into frames (`event:`, `id:`, `data:`
//!   fields terminated by a blank line)
//! - [`parse_message`] turns a frame into a [`Message`], decoding the data as
//!   JSON or keeping it raw when it is not valid JSON
//!
//! # Module structure
//! - `decoder` - byte-to-line decoding
//! - `frame` - line classification and frame assembly
//! - `message` - frame-to-message parsing
//! - `payloads` - typed agent backend requests and events

mod decoder;
mod frame;
mod message;
mod payloads;

pub use decoder::LineDecoder;
pub use frame::{parse_sse_line, Frame, FrameAssembler, SseLine};
pub use message::{parse_message, Message, MessageBody};
pub use payloads::{AgentEvent, ChatRequest, TaskProgress, TaskStreamRequest};
