//! Instance event publishing

use marquee_types::{Instance, InstanceEvent, InstanceEventEnvelope};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 4096;

/// Broadcasts instance events to any number of subscribers.
///
/// Cloning shares the channel. Publishing with no subscribers is not an
/// error.
#[derive(Clone)]
pub struct EventPublisher {
    event_tx: broadcast::Sender<InstanceEventEnvelope>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEventEnvelope> {
        self.event_tx.subscribe()
    }

    pub fn publish(&self, instance: &Instance, event: InstanceEvent) {
        let envelope = InstanceEventEnvelope::new(instance.key(), instance.status, event);
        let _ = self.event_tx.send(envelope);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
