//! Interjection event bus.
//!
//! When the shadow agent speaks, the coordinator publishes an event here.
//! The hosting application subscribes instead of registering a late-bound
//! callback, which keeps construction order flat: the bus exists before
//! either agent does.

use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity; slow subscribers lose oldest events.
const DEFAULT_CAPACITY: usize = 64;

/// A shadow-agent interjection that was actually sent.
#[derive(Debug, Clone)]
pub struct InterjectionEvent {
    /// Group the interjection was sent to.
    pub group_id: i64,
    /// Persona id of the speaker.
    pub agent_id: String,
    /// Text that was sent.
    pub content: String,
    /// Message id the interjection replied to, if any.
    pub in_reply_to: Option<i64>,
}

/// Broadcast channel for interjection events.
#[derive(Debug)]
pub struct InterjectionBus {
    sender: broadcast::Sender<InterjectionEvent>,
}

impl Default for InterjectionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InterjectionBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future interjections.
    pub fn subscribe(&self) -> broadcast::Receiver<InterjectionEvent> {
        self.sender.subscribe()
    }

    /// Publish an interjection. Having no subscribers is not an error.
    pub fn publish(&self, event: InterjectionEvent) {
        trace!(group_id = event.group_id, agent = %event.agent_id, "Interjection published");
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = InterjectionBus::new();
        let mut rx = bus.subscribe();
        bus.publish(InterjectionEvent {
            group_id: 1,
            agent_id: "shadow".into(),
            content: "couldn't resist".into(),
            in_reply_to: Some(42),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.group_id, 1);
        assert_eq!(event.in_reply_to, Some(42));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = InterjectionBus::new();
        bus.publish(InterjectionEvent {
            group_id: 1,
            agent_id: "shadow".into(),
            content: "into the void".into(),
            in_reply_to: None,
        });
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let bus = InterjectionBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(InterjectionEvent {
            group_id: 9,
            agent_id: "shadow".into(),
            content: "hello both".into(),
            in_reply_to: None,
        });
        assert_eq!(a.recv().await.unwrap().group_id, 9);
        assert_eq!(b.recv().await.unwrap().group_id, 9);
    }
}
