//! Transcript: the ordered chat messages of one view session

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Transcript invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    /// A streaming message already exists
    #[error("a reply is already streaming")]
    StreamInFlight,
    /// No streaming message to append to
    #[error("no reply is streaming")]
    NoStream,
}

/// Stable identifier of a message within its transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    System,
}

/// A single message in the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    /// Still being filled from an open response stream
    pub streaming: bool,
    /// System-authored error report
    pub is_error: bool,
    pub sent_at: DateTime<Utc>,
}

/// Ordered, append-only list of messages.
///
/// Only the last message may change, and only while it is streaming.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
}

impl Transcript {
    /// Empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript seeded with a system welcome message
    pub fn with_welcome(text: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push_system(text);
        transcript
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The streaming message, if one is in flight
    pub fn streaming(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.streaming)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming().is_some()
    }

    fn push(&mut self, sender: Sender, content: String, streaming: bool, is_error: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            sender,
            content,
            streaming,
            is_error,
            sent_at: Utc::now(),
        });
        id
    }

    /// Append a user message.
    ///
    /// A streaming message is finalized first so it never stops being last.
    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.finish_stream();
        self.push(Sender::User, text.into(), false, false)
    }

    /// Append a system message
    pub fn push_system(&mut self, text: impl Into<String>) -> MessageId {
        self.finish_stream();
        self.push(Sender::System, text.into(), false, false)
    }

    /// Append a system-authored error message
    pub fn push_error(&mut self, text: impl Into<String>) -> MessageId {
        self.finish_stream();
        self.push(Sender::System, text.into(), false, true)
    }

    /// Start an empty streaming system message
    pub fn begin_stream(&mut self) -> Result<MessageId, TranscriptError> {
        if self.is_streaming() {
            return Err(TranscriptError::StreamInFlight);
        }
        Ok(self.push(Sender::System, String::new(), true, false))
    }

    /// Append text to the streaming message
    pub fn append_stream(&mut self, text: &str) -> Result<(), TranscriptError> {
        match self.messages.last_mut() {
            Some(last) if last.streaming => {
                last.content.push_str(text);
                Ok(())
            }
            _ => Err(TranscriptError::NoStream),
        }
    }

    /// Finalize the streaming message, keeping its accumulated content.
    ///
    /// Returns the finalized id, or `None` when nothing was streaming.
    pub fn finish_stream(&mut self) -> Option<MessageId> {
        match self.messages.last_mut() {
            Some(last) if last.streaming => {
                last.streaming = false;
                Some(last.id)
            }
            _ => None,
        }
    }

    /// Remove every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
