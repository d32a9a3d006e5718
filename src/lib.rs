//! agentj-stream - Server-Sent Events client for the AgentJ agent backend
//!
//! Streams chat replies and task progress over `text/event-stream`
//! responses. The library exposes:
//! - [`session`] - POST a JSON payload and read the response incrementally
//! - [`event_source`] - follow GET-only event-source endpoints
//! - [`retry`] - bounded, cancellable retry of connection attempts
//! - [`sse`] - the byte -> line -> frame -> message pipeline both share

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod event_source;
pub mod retry;
pub mod session;
pub mod sse;
pub mod traits;
