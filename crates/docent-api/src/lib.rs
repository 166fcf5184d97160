//! docent-api: Document evaluation backend client
//!
//! This crate provides the wire types of the doc-eval backend, an HTTP client
//! for it, and the decoding layer that turns a chunked response body into text.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{ChatBackend, HttpBackend};
pub use error::{Error, Result};
pub use stream::{ByteStream, ChatResponse, TextStream, Utf8StreamDecoder};
pub use types::*;
