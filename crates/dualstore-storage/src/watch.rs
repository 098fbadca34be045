//! Watch streams.

use std::collections::BTreeMap;

use dualstore_core::WatchEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// A stream of changes from one store, filtered by label selector.
///
/// Receivers that fall behind the store's broadcast buffer skip the dropped
/// events and keep going.
#[derive(Debug)]
pub struct WatchStream {
    receiver: broadcast::Receiver<WatchEvent>,
    label_selector: BTreeMap<String, String>,
}

impl WatchStream {
    pub fn new(
        receiver: broadcast::Receiver<WatchEvent>,
        label_selector: BTreeMap<String, String>,
    ) -> Self {
        Self {
            receiver,
            label_selector,
        }
    }

    /// Waits for the next matching event. Returns `None` once the store has
    /// shut its broadcaster down.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.object.matches_labels(&self.label_selector) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watch receiver lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
