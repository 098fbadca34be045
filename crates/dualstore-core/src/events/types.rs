//! Event types for object watches.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::resource::ResourceObject;

/// Type of change carried by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    /// Object was created
    Added,
    /// Object was updated
    Modified,
    /// Object was deleted
    Deleted,
}

impl WatchEventType {
    /// Returns the string representation of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventType::Added => "ADDED",
            WatchEventType::Modified => "MODIFIED",
            WatchEventType::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change to a stored object.
///
/// For deletions `object` holds the last persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: ResourceObject,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl WatchEvent {
    pub fn new(event_type: WatchEventType, object: ResourceObject) -> Self {
        Self {
            event_type,
            object,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn added(object: ResourceObject) -> Self {
        Self::new(WatchEventType::Added, object)
    }

    pub fn modified(object: ResourceObject) -> Self {
        Self::new(WatchEventType::Modified, object)
    }

    pub fn deleted(object: ResourceObject) -> Self {
        Self::new(WatchEventType::Deleted, object)
    }

    pub fn name(&self) -> &str {
        self.object.name()
    }
}
