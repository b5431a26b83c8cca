//! Periodic polling over a shrinking working set of ids.
//!
//! A [`Poller`] runs at most one [`PollSession`] at a time. Each tick fans
//! out one fetch per id still in the working set, waits for all of them, and
//! drops the ids whose fresh result is terminal or whose fetch failed
//! permanently. Ticks never overlap: they run one after another in the
//! session's task and missed interval ticks are skipped.

mod session;

pub use session::PollSession;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::time::MissedTickBehavior;

use crate::error::{Result, TrackerError};

/// What a poller fetches and where results go.
#[async_trait]
pub trait PollTarget: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn fetch(&self, id: &str) -> Result<Self::Output>;

    /// Whether `output` ends polling for its id.
    fn is_terminal(&self, output: &Self::Output) -> bool;

    /// Applies a fetched result. Not called once the session is cancelled.
    fn merge(&self, id: &str, output: Self::Output);

    /// Called for each failed fetch. The id stays in the working set when
    /// the error is retryable and is dropped otherwise.
    fn on_fetch_error(&self, id: &str, error: &TrackerError) {
        log::warn!("Status fetch for {} failed: {}", id, error);
    }
}

pub struct Poller<T: PollTarget> {
    target: Arc<T>,
    current: Mutex<Option<PollSession>>,
}

impl<T: PollTarget> Poller<T> {
    pub fn new(target: Arc<T>) -> Self {
        Self {
            target,
            current: Mutex::new(None),
        }
    }

    /// Starts a new session over `ids`, cancelling the current one.
    ///
    /// The first tick fires immediately. Must be called from within a tokio
    /// runtime.
    pub fn start<I>(&self, ids: I, interval: Duration) -> PollSession
    where
        I: IntoIterator<Item = String>,
    {
        let session = PollSession::new(ids);
        let previous = self.lock().replace(session.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        log::info!(
            "Starting poll session {} over {} ids every {:?}",
            session.id(),
            session.working_set().len(),
            interval
        );
        tokio::spawn(run(Arc::clone(&self.target), session.clone(), interval));
        session
    }

    /// Starts a new session over the current working set plus `id`.
    pub fn readmit(&self, id: &str, interval: Duration) -> PollSession {
        let mut ids: BTreeSet<String> = self
            .session()
            .filter(PollSession::is_active)
            .map(|s| s.working_set().into_iter().collect())
            .unwrap_or_default();
        ids.insert(id.to_string());
        self.start(ids, interval)
    }

    /// Requests an immediate extra tick of the active session.
    pub fn trigger_now(&self) -> bool {
        match self.session() {
            Some(session) if session.is_active() => {
                session.wake();
                true
            }
            _ => false,
        }
    }

    /// Removes `id` from the active session, if it is being polled.
    pub fn forget(&self, id: &str) {
        if let Some(session) = self.session() {
            session.remove(&[id.to_string()]);
        }
    }

    pub fn stop(&self) {
        if let Some(session) = self.lock().take() {
            session.cancel();
        }
    }

    pub fn session(&self) -> Option<PollSession> {
        self.lock().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.session().map(|s| s.is_active()).unwrap_or(false)
    }

    fn lock(&self) -> MutexGuard<'_, Option<PollSession>> {
        self.current.lock().unwrap_or_else(|poisoned| {
            log::warn!("Poller lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl<T: PollTarget> Drop for Poller<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<T: PollTarget>(target: Arc<T>, session: PollSession, interval: Duration) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = timer.tick() => {},
            _ = session.woken() => {},
        }

        if !session.is_active() {
            break;
        }

        let ids = session.working_set();
        if ids.is_empty() {
            break;
        }

        session.begin_tick();
        log::debug!(
            "Poll session {} tick {}: fetching {} ids",
            session.id(),
            session.tick_count(),
            ids.len()
        );

        let results = join_all(ids.iter().map(|id| {
            let target = &target;
            async move { (id, target.fetch(id).await) }
        }))
        .await;

        if !session.is_active() {
            log::debug!(
                "Poll session {} cancelled mid-tick, discarding {} results",
                session.id(),
                results.len()
            );
            break;
        }

        let mut done = Vec::new();
        for (id, result) in results {
            match result {
                Ok(output) => {
                    if target.is_terminal(&output) {
                        done.push(id.clone());
                    }
                    target.merge(id, output);
                }
                Err(e) => {
                    target.on_fetch_error(id, &e);
                    if !e.is_retryable() {
                        log::warn!("Giving up on {} after a permanent error", id);
                        done.push(id.clone());
                    }
                }
            }
        }

        if session.remove(&done) == 0 {
            log::info!(
                "Poll session {} finished after {} ticks",
                session.id(),
                session.tick_count()
            );
            break;
        }
    }

    session.mark_finished();
}
