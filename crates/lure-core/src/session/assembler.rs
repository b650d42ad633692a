//! Ordered message log with in-place assembly of the streaming reply.
//!
//! At most one assistant message is in progress at a time, and while it is
//! in progress it is the last element of the log. Every mutation is
//! published on the [`EventBus`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lure_types::chat::{ChatMessage, MessageRole, MessageState, SessionId};
use lure_types::event::SessionEvent;

use crate::event::EventBus;

#[derive(Debug)]
pub struct MessageAssembler {
    session_id: SessionId,
    messages: Vec<ChatMessage>,
    bus: EventBus,
}

impl MessageAssembler {
    pub fn new(session_id: SessionId, bus: EventBus) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            bus,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The in-progress assistant message, if any.
    pub fn in_progress(&self) -> Option<&ChatMessage> {
        self.messages.last().filter(|m| m.is_streaming())
    }

    /// Append a finalized counterpart message and return its id.
    ///
    /// An in-progress assistant message is finalized first so that it can
    /// never end up anywhere but last.
    pub fn append_user_message(&mut self, text: impl Into<String>) -> Uuid {
        self.push_complete(MessageRole::User, text.into(), Utc::now())
    }

    /// Like [`append_user_message`](Self::append_user_message), keeping the
    /// time the counterpart sent the message.
    pub fn append_user_message_at(&mut self, text: impl Into<String>, sent_at: DateTime<Utc>) -> Uuid {
        self.push_complete(MessageRole::User, text.into(), sent_at)
    }

    /// Append a finalized persona message in one piece.
    pub fn append_assistant_message(&mut self, text: impl Into<String>) -> Uuid {
        self.push_complete(MessageRole::Assistant, text.into(), Utc::now())
    }

    /// Extend the in-progress assistant message, or start one.
    pub fn apply_assistant_delta(&mut self, text: &str) -> Uuid {
        if let Some(last) = self.messages.last_mut().filter(|m| m.is_streaming()) {
            last.content.push_str(text);
            let message_id = last.id;
            self.bus.publish(SessionEvent::MessageDelta {
                session_id: self.session_id.clone(),
                message_id,
                text: text.to_string(),
            });
            return message_id;
        }

        let message = ChatMessage {
            id: Uuid::now_v7(),
            role: MessageRole::Assistant,
            content: text.to_string(),
            timestamp: Utc::now(),
            state: MessageState::Streaming,
        };
        let message_id = message.id;
        self.messages.push(message.clone());
        self.bus.publish(SessionEvent::MessageAppended {
            session_id: self.session_id.clone(),
            message,
        });
        message_id
    }

    /// Mark the in-progress assistant message complete. Returns its id, or
    /// `None` when nothing was in progress.
    pub fn finalize_assistant(&mut self) -> Option<Uuid> {
        let last = self.messages.last_mut().filter(|m| m.is_streaming())?;
        last.state = MessageState::Complete;
        let message_id = last.id;
        self.bus.publish(SessionEvent::MessageFinalized {
            session_id: self.session_id.clone(),
            message_id,
        });
        Some(message_id)
    }

    /// Replace the log with previously exchanged messages.
    ///
    /// Used to hydrate a session from a caller-supplied history. Restored
    /// messages are always complete and kept in the given order.
    pub fn restore(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages = messages
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|mut m| {
                m.state = MessageState::Complete;
                m
            })
            .collect();
        for message in &self.messages {
            self.bus.publish(SessionEvent::MessageAppended {
                session_id: self.session_id.clone(),
                message: message.clone(),
            });
        }
    }

    /// Clear the log and switch to a fresh session id. Returns the previous id.
    pub fn reset(&mut self) -> SessionId {
        self.reset_to(SessionId::generate())
    }

    /// Clear the log and switch to the given session id.
    pub fn reset_to(&mut self, session_id: SessionId) -> SessionId {
        self.messages.clear();
        let previous = std::mem::replace(&mut self.session_id, session_id);
        self.bus.publish(SessionEvent::SessionReset {
            previous: previous.clone(),
            session_id: self.session_id.clone(),
        });
        previous
    }

    fn push_complete(&mut self, role: MessageRole, content: String, timestamp: DateTime<Utc>) -> Uuid {
        self.finalize_assistant();
        let mut message = ChatMessage::complete(role, content);
        message.timestamp = timestamp;
        let message_id = message.id;
        self.messages.push(message.clone());
        self.bus.publish(SessionEvent::MessageAppended {
            session_id: self.session_id.clone(),
            message,
        });
        message_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(SessionId::from("s-1"), EventBus::new(64))
    }

    fn streaming_count(a: &MessageAssembler) -> usize {
        a.messages().iter().filter(|m| m.is_streaming()).count()
    }

    #[test]
    fn consecutive_deltas_extend_one_message() {
        let mut a = assembler();
        a.append_user_message("You won a prize!");
        let first = a.apply_assistant_delta("Oh ");
        let second = a.apply_assistant_delta("my!");

        assert_eq!(first, second);
        assert_eq!(a.len(), 2);
        assert_eq!(a.messages()[1].content, "Oh my!");
        assert!(a.messages()[1].is_streaming());
    }

    #[test]
    fn finalize_stops_further_extension() {
        let mut a = assembler();
        let id = a.apply_assistant_delta("Hello");
        assert_eq!(a.finalize_assistant(), Some(id));
        assert_eq!(a.finalize_assistant(), None);

        let next = a.apply_assistant_delta("again");
        assert_ne!(id, next);
        assert_eq!(a.messages()[0].content, "Hello");
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn at_most_one_in_progress_and_always_last() {
        let mut a = assembler();
        a.apply_assistant_delta("partial");
        a.append_user_message("interrupt");
        a.apply_assistant_delta("new");
        a.append_assistant_message("whole");
        a.apply_assistant_delta("tail");

        assert_eq!(streaming_count(&a), 1);
        assert!(a.messages().last().unwrap().is_streaming());
        assert_eq!(a.in_progress().unwrap().content, "tail");
        assert_eq!(a.messages()[0].content, "partial");
        assert!(!a.messages()[0].is_streaming());
    }

    #[test]
    fn timestamp_is_creation_time() {
        let mut a = assembler();
        a.apply_assistant_delta("a");
        let created = a.messages()[0].timestamp;
        std::thread::sleep(std::time::Duration::from_millis(5));
        a.apply_assistant_delta("b");
        assert_eq!(a.messages()[0].timestamp, created);
    }

    #[test]
    fn reset_clears_log_and_assigns_new_id() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut a = MessageAssembler::new(SessionId::from("old"), bus);
        a.append_user_message("hi");

        let previous = a.reset();
        assert_eq!(previous.as_str(), "old");
        assert_ne!(a.session_id().as_str(), "old");
        assert!(a.is_empty());

        let mut saw_reset = false;
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::SessionReset { previous, .. } = event {
                assert_eq!(previous.as_str(), "old");
                saw_reset = true;
            }
        }
        assert!(saw_reset);
    }

    #[test]
    fn restore_drops_system_turns_and_completes_messages() {
        let mut a = assembler();
        let mut streaming = ChatMessage::complete(MessageRole::Assistant, "half");
        streaming.state = MessageState::Streaming;
        a.restore(vec![
            ChatMessage::complete(MessageRole::System, "directive"),
            ChatMessage::complete(MessageRole::User, "send money"),
            streaming,
        ]);

        assert_eq!(a.len(), 2);
        assert_eq!(streaming_count(&a), 0);
        assert_eq!(a.messages()[0].role, MessageRole::User);
    }

    #[test]
    fn mutations_are_published() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut a = MessageAssembler::new(SessionId::from("s"), bus);

        a.append_user_message("hi");
        a.apply_assistant_delta("he");
        a.apply_assistant_delta("llo");
        a.finalize_assistant();

        let names: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "message_appended",
                "message_appended",
                "message_delta",
                "message_finalized"
            ]
        );
    }
}
