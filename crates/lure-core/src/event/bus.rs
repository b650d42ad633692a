//! Broadcast bus distributing `SessionEvent` to any number of renderers.

use lure_types::event::SessionEvent;
use tokio::sync::broadcast;

/// Default channel capacity. Streaming replies emit one event per delta.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Multi-consumer event bus for session events.
///
/// Publishing with no subscribers is a no-op. A subscriber that falls more
/// than `capacity` events behind receives `RecvError::Lagged` and keeps going.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!(event = event.name(), session_id = %event.session_id(), "publish");
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
