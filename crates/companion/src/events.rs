//! Event bus for envelope traffic and channel state changes.

use domain::models::LocationEnvelope;
use tokio::sync::broadcast;

use crate::peer::ActivationState;

/// Everything a UI or host process can observe about the companion.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An envelope was sent, received, answered or failed.
    DataFlowed(LocationEnvelope),

    /// The peer channel moved through its activation states.
    ActivationChanged(ActivationState),

    /// The paired device became reachable (`true`) or unreachable.
    ReachabilityChanged(bool),
}

/// Broadcasts [`Event`]s to every live subscriber.
///
/// A subscription lasts as long as its receiver. Slow receivers lose the
/// oldest events once the channel capacity is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: Event) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(Event::ReachabilityChanged(true));

        assert_eq!(a.recv().await.unwrap(), Event::ReachabilityChanged(true));
        assert_eq!(b.recv().await.unwrap(), Event::ReachabilityChanged(true));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(Event::ActivationChanged(ActivationState::Activated));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_receiver_ends_subscription() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
