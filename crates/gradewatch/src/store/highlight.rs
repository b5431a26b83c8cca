//! Grace timers that clear the `just_updated` highlight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::reducer::Action;
use super::shared::SharedStore;

/// One pending `ClearHighlight` per entity.
///
/// Scheduling a new timer for an id aborts the one already pending, so a
/// flag set by a later update is never cleared early by an older timer.
pub struct HighlightTimers {
    store: Arc<SharedStore>,
    grace: Duration,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl HighlightTimers {
    pub fn new(store: Arc<SharedStore>, grace: Duration) -> Self {
        Self {
            store,
            grace,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Clears the highlight of `id` once the grace period elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, id: &str) {
        let store = Arc::clone(&self.store);
        let grace = self.grace;
        let target = id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            store.dispatch(Action::ClearHighlight(target));
        });

        let mut timers = self.lock();
        timers.retain(|_, h| !h.is_finished());
        if let Some(previous) = timers.insert(id.to_string(), handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self, id: &str) {
        if let Some(handle) = self.lock().remove(id) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.lock().drain() {
            handle.abort();
        }
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.lock().values().filter(|h| !h.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(|poisoned| {
            log::warn!("Highlight timer lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Drop for HighlightTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
