//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - streaming POST transport used by
//!   [`StreamSession`](crate::session::StreamSession)

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError, StreamResponse};
