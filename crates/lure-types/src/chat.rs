//! Session and message types for a honeypot conversation.
//!
//! A session is one end-to-end conversation with a presumed scammer.
//! Internally the counterpart speaks as [`MessageRole::User`] and the
//! persona answers as [`MessageRole::Assistant`]; see [`crate::wire`] for
//! the inverted external sender tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

pub use crate::llm::MessageRole;

/// Opaque session identifier.
///
/// Locally created sessions use a UUIDv7 string; sessions opened through
/// the wire contract keep whatever identifier the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether a message can still receive streamed deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Streaming,
    Complete,
}

/// A single message in the visible conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Creation time of the message, not of its latest delta.
    pub timestamp: DateTime<Utc>,
    pub state: MessageState,
}

impl ChatMessage {
    /// Build a finalized message stamped with the current time.
    pub fn complete(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            state: MessageState::Complete,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state == MessageState::Streaming
    }
}
