//! Watch events emitted by stores after successful writes.
//!
//! Stores publish a [`WatchEvent`] through a [`WatchBroadcaster`] once a write
//! has been persisted; watchers subscribe and receive every event sent after
//! they subscribed.

pub mod broadcaster;
pub mod types;

pub use broadcaster::WatchBroadcaster;
pub use types::{WatchEvent, WatchEventType};
