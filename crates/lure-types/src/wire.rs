//! External honeypot-service wire contract.
//!
//! The externally visible conversation tags the counterpart as `scammer`
//! and the persona's replies as `user`. That is inverted relative to the
//! internal roles, where the counterpart is [`MessageRole::User`] and the
//! persona is [`MessageRole::Assistant`]. All translation goes through
//! [`Sender`] so the mapping lives in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{ChatMessage, MessageRole, MessageState, SessionId};

/// Sender tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The counterpart being engaged.
    Scammer,
    /// The honeypot persona.
    User,
}

impl Sender {
    /// Internal role for this sender.
    pub fn role(self) -> MessageRole {
        match self {
            Sender::Scammer => MessageRole::User,
            Sender::User => MessageRole::Assistant,
        }
    }

    /// Wire sender for an internal role. System turns never leave the core.
    pub fn from_role(role: MessageRole) -> Option<Self> {
        match role {
            MessageRole::User => Some(Sender::Scammer),
            MessageRole::Assistant => Some(Sender::User),
            MessageRole::System => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sender::Scammer => "scammer",
            Sender::User => "user",
        }
    }
}

/// Timestamp as sent by callers: epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
}

impl WireTimestamp {
    pub fn now() -> Self {
        WireTimestamp::Text(Utc::now().to_rfc3339())
    }

    /// Parse into a UTC time, if the value is well-formed.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            WireTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        WireTimestamp::Text(value.to_rfc3339())
    }
}

/// One turn of the conversation history on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default = "WireTimestamp::now")]
    pub timestamp: WireTimestamp,
}

impl ConversationMessage {
    /// Translate to an internal, finalized log message.
    ///
    /// Unparseable timestamps fall back to the time of translation.
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            role: self.sender.role(),
            content: self.text.clone(),
            timestamp: self.timestamp.to_datetime().unwrap_or_else(Utc::now),
            state: MessageState::Complete,
        }
    }

    /// Translate an internal message; `None` for system turns.
    pub fn from_chat_message(message: &ChatMessage) -> Option<Self> {
        Some(Self {
            sender: Sender::from_role(message.role)?,
            text: message.content.clone(),
            timestamp: message.timestamp.into(),
        })
    }
}

/// Channel and locale hints attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// One of `SMS`, `WhatsApp`, `Email`, `Web` in practice; kept open.
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_channel() -> String {
    "Web".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_locale() -> String {
    "IN".to_string()
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            language: default_language(),
            locale: default_locale(),
        }
    }
}

/// The inbound message of a honeypot request. Always from the scammer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default = "WireTimestamp::now")]
    pub timestamp: WireTimestamp,
}

/// Request body of `POST /api/honeypot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotRequest {
    pub session_id: SessionId,
    pub message: InboundMessage,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body of `POST /api/honeypot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoneypotResponse {
    pub status: ResponseStatus,
    pub reply: String,
}

impl HoneypotResponse {
    pub fn success(reply: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            reply: reply.into(),
        }
    }

    pub fn error(reply: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            reply: reply.into(),
        }
    }
}

/// Request body of `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub session_id: SessionId,
    pub conversation_history: Vec<ConversationMessage>,
}
