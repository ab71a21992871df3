//! Session change notifications
//!
//! The auth holder broadcasts a [`SessionEvent`] every time the active session
//! changes so views can react without polling.

use crate::models::UserProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Login succeeded
    LoggedIn {
        session_id: String,
        user: UserProfile,
        timestamp: DateTime<Utc>,
    },

    /// Local session state was cleared
    LoggedOut { timestamp: DateTime<Utc> },
}

impl SessionEvent {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionEvent::LoggedOut { .. })
    }
}

/// Broadcast channel for session events
///
/// Cloning shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Lagging subscribers lose the oldest events first.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit_lossy(SessionEvent::LoggedOut {
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert!(!event.is_authenticated());
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(SessionEvent::LoggedOut {
            timestamp: Utc::now(),
        });
    }
}
