//! Response body decoding: bytes in, text increments out

use async_stream::stream;
use encoding_rs::{CoderResult, Decoder, UTF_8};
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;

/// Raw body chunks as delivered by the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Decoded text increments, in arrival order
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Shape of a chat response, resolved once when the response opens
pub enum ChatResponse {
    /// Chunked text body
    Stream(ByteStream),
    /// Single JSON object carrying the whole reply
    Complete(String),
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatResponse::Stream(_) => f.write_str("ChatResponse::Stream(..)"),
            ChatResponse::Complete(text) => f
                .debug_tuple("ChatResponse::Complete")
                .field(&text.len())
                .finish(),
        }
    }
}

impl ChatResponse {
    /// Whether a `Content-Type` header value selects the JSON shape
    pub fn is_json_content_type(content_type: Option<&str>) -> bool {
        content_type
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }

    /// Turn either shape into a stream of text increments
    pub fn into_text_stream(self) -> TextStream {
        match self {
            ChatResponse::Stream(bytes) => decode_stream(bytes),
            ChatResponse::Complete(text) => {
                let items: Vec<Result<String>> = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Ok(text)]
                };
                Box::pin(futures::stream::iter(items))
            }
        }
    }
}

/// Stateful UTF-8 decoder that survives multi-byte characters split across
/// chunk boundaries.
///
/// One decoder must be held for the whole response. Malformed sequences are
/// replaced with U+FFFD rather than failing the stream.
pub struct Utf8StreamDecoder {
    decoder: Decoder,
}

impl Default for Utf8StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8StreamDecoder {
    /// Create a decoder. A leading UTF-8 BOM is stripped; other byte order
    /// marks are decoded as ordinary (invalid) bytes.
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
        }
    }

    /// Decode a chunk, returning every character completed by it
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.run(chunk, false)
    }

    /// Flush the decoder at end of stream
    pub fn finish(mut self) -> String {
        self.run(&[], true)
    }

    fn run(&mut self, mut src: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() + 4);
        let mut out = String::with_capacity(capacity);

        loop {
            let (result, read, _had_errors) = self.decoder.decode_to_string(src, &mut out, last);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => return out,
                CoderResult::OutputFull => {
                    let more = self
                        .decoder
                        .max_utf8_buffer_length(src.len())
                        .unwrap_or(src.len() + 4);
                    out.reserve(more.max(4));
                }
            }
        }
    }
}

/// Decode a byte stream into ordered text increments.
///
/// Empty increments (a chunk holding only part of a character) are skipped.
/// A transport error is yielded once and ends the stream.
pub fn decode_stream(mut bytes: ByteStream) -> TextStream {
    Box::pin(stream! {
        let mut decoder = Utf8StreamDecoder::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    let text = decoder.decode(&chunk);
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    tracing::debug!("response body failed mid-stream: {}", e);
                    yield Err(e);
                    return;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            yield Ok(tail);
        }
    })
}
