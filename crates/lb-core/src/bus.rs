//! Event bus the channels publish incoming events to

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::Event;
use crate::Result;

/// Host event bus
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Hand an event to the host for processing
    async fn send_event(&self, event: Event) -> Result<()>;
}

/// In-process event bus backed by a broadcast channel
///
/// Every subscriber sees every event. Sending while nobody is subscribed
/// drops the event without error.
#[derive(Clone)]
pub struct BroadcastEventBus {
    tx: broadcast::Sender<Event>,
}

impl BroadcastEventBus {
    /// Create a bus that buffers up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all events sent after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn send_event(&self, event: Event) -> Result<()> {
        debug!(
            "Event {} ({} {} for bot {})",
            event.id,
            event.direction.as_str(),
            event.event_type,
            event.bot_id
        );
        if self.tx.send(event).is_err() {
            debug!("No subscribers on event bus, event dropped");
        }
        Ok(())
    }
}
