//! Normalized event model, bounded store and push fan-out.

mod hub;
mod store;
mod types;

pub use hub::{EventHub, EventSink, DEFAULT_EVENT_CHANNEL_CAPACITY};
pub use store::{EventStore, HistoryPage, StoreError, DEFAULT_BUFFER_CAPACITY};
pub use types::{Event, EventKind, Metadata, SourceName, TimestampOrigin};
