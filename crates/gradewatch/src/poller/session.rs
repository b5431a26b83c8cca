use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{watch, Notify};
use uuid::Uuid;

struct SessionState {
    id: Uuid,
    working_set: Mutex<BTreeSet<String>>,
    tick_count: AtomicU64,
    active: AtomicBool,
    wake: Notify,
    done: watch::Sender<bool>,
}

/// Handle to one polling session.
///
/// The working set only shrinks over the life of a session. Clones share
/// the same session.
#[derive(Clone)]
pub struct PollSession {
    inner: Arc<SessionState>,
}

impl PollSession {
    pub(crate) fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionState {
                id: Uuid::new_v4(),
                working_set: Mutex::new(ids.into_iter().collect()),
                tick_count: AtomicU64::new(0),
                active: AtomicBool::new(true),
                wake: Notify::new(),
                done,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Ids still being polled, in sorted order.
    pub fn working_set(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    /// Number of ticks that issued fetches.
    pub fn tick_count(&self) -> u64 {
        self.inner.tick_count.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Stops the session. Safe to call any number of times.
    pub fn cancel(&self) {
        if self.inner.active.swap(false, Ordering::AcqRel) {
            log::debug!("Poll session {} cancelled", self.inner.id);
            self.inner.wake.notify_one();
        }
    }

    /// Resolves once the session's task has exited.
    pub async fn finished(&self) {
        let mut rx = self.inner.done.subscribe();
        // The sender lives as long as `self`.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn is_finished(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Requests an extra tick as soon as the current one, if any, completes.
    pub(crate) fn wake(&self) {
        self.inner.wake.notify_one();
    }

    pub(crate) async fn woken(&self) {
        self.inner.wake.notified().await;
    }

    pub(crate) fn begin_tick(&self) {
        self.inner.tick_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Removes ids from the working set and returns how many remain.
    pub(crate) fn remove<'a, I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut set = self.lock();
        for id in ids {
            set.remove(id);
        }
        set.len()
    }

    pub(crate) fn mark_finished(&self) {
        self.inner.active.store(false, Ordering::Release);
        self.inner.done.send_replace(true);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.inner.working_set.lock().unwrap_or_else(|poisoned| {
            log::warn!("Poll session lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for PollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSession")
            .field("id", &self.inner.id)
            .field("working_set", &self.working_set())
            .field("tick_count", &self.tick_count())
            .field("active", &self.is_active())
            .finish()
    }
}
