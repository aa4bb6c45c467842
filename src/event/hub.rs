//! Fan-out of normalized events to the store and live subscribers.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::store::EventStore;
use super::types::Event;

/// Default capacity for the live event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Receiver of events emitted by the watcher, in per-source order.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Accept one event.
    async fn emit(&self, event: Event);
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<Event> {
    async fn emit(&self, event: Event) {
        if self.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

/// Store plus push subscription.
///
/// Every published event is appended to the [`EventStore`] and then
/// broadcast to current subscribers. Subscribers that fall behind the
/// channel capacity miss events; the store still has them.
#[derive(Debug)]
pub struct EventHub {
    store: EventStore,
    tx: broadcast::Sender<Event>,
}

impl EventHub {
    /// Create a hub over `store` with the default channel capacity.
    #[must_use]
    pub fn new(store: EventStore) -> Self {
        Self::with_channel_capacity(store, DEFAULT_EVENT_CHANNEL_CAPACITY)
    }

    /// Create a hub with a custom broadcast capacity.
    #[must_use]
    pub fn with_channel_capacity(store: EventStore, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { store, tx }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Store and broadcast one event.
    pub async fn publish(&self, event: Event) {
        self.store.append(event.clone()).await;
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl EventSink for EventHub {
    async fn emit(&self, event: Event) {
        self.publish(event).await;
    }
}
