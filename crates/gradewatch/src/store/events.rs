//! Store change broadcaster.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What a dispatch changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreChange {
    Initialized { count: usize },
    Updated { id: String, just_updated: bool },
    HighlightCleared { id: String },
    Deleted { id: String },
}

/// Notification sent after every effective store change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEvent {
    /// Monotonic revision of the collection after the change.
    pub revision: u64,
    pub change: StoreChange,
    pub timestamp: DateTime<Utc>,
}

impl StoreEvent {
    pub fn new(revision: u64, change: StoreChange) -> Self {
        Self {
            revision,
            change,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts store events to every subscriber.
#[derive(Clone)]
pub struct StoreEventBroadcaster {
    sender: Arc<broadcast::Sender<StoreEvent>>,
}

impl StoreEventBroadcaster {
    /// Creates a broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: StoreEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StoreEventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
