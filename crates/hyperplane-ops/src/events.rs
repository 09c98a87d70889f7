//! Change notifications published by the operation engine.

use std::path::PathBuf;

use hyperplane_core::TagSet;
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_SIZE: usize = 100;

/// A change other components may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FsEvent {
    /// A transfer created the directory for a new tag location.
    TagLocationCreated {
        /// The tags leading to the new location.
        tags: TagSet,
        /// The directory representing those tags.
        location: PathBuf,
    },
}

/// Something that accepts published events.
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Must not block.
    fn publish(&self, event: FsEvent);
}

/// Broadcast-backed publish/subscribe hub.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FsEvent>,
}

impl EventBus {
    /// Create a new event bus.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<FsEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: FsEvent) {
        tracing::debug!(?event, "publishing event");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
