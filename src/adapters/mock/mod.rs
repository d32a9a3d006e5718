//! Mock implementations for testing.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - streaming transport with scripted responses and
//!   release counting

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
