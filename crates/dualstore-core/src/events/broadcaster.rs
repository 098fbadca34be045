//! Broadcaster for watch events.
//!
//! Wraps a tokio broadcast channel so a single store can fan its changes out
//! to any number of watchers.

use tokio::sync::broadcast;

use super::types::WatchEvent;
use crate::resource::ResourceObject;

/// Default buffer size for the broadcast channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Clone)]
pub struct WatchBroadcaster {
    sender: broadcast::Sender<WatchEvent>,
}

impl WatchBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, 0 when
    /// nobody is watching.
    pub fn send(&self, event: WatchEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    pub fn send_added(&self, object: ResourceObject) -> usize {
        self.send(WatchEvent::added(object))
    }

    pub fn send_modified(&self, object: ResourceObject) -> usize {
        self.send(WatchEvent::modified(object))
    }

    pub fn send_deleted(&self, object: ResourceObject) -> usize {
        self.send(WatchEvent::deleted(object))
    }

    /// Subscribe to events.
    ///
    /// Events sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WatchBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WatchBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
