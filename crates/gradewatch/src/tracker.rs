//! The tracker facade.
//!
//! [`JobTracker`] wires a [`StatusSource`] to the shared store, the elapsed
//! time tracker, highlight timers and the poller. Consumers only read from
//! it; every mutation flows through a load, a poll tick, an action or a
//! delete.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::elapsed::{ElapsedLabel, ElapsedTimeTracker, JobKey};
use crate::error::{Result, TrackerError};
use crate::poller::{PollSession, PollTarget, Poller};
use crate::source::{ActionParams, Collection, StatusSource};
use crate::status::{JobKind, ReadinessTier};
use crate::store::{
    Action, Entity, HighlightTimers, SharedStore, StoreEvent, StoreEventBroadcaster,
};
use crate::views::{self, Stats};

/// A per-id fetch result stamped with the sequence it was issued under.
struct Fetched {
    sequence: u64,
    entity: Entity,
}

struct TrackerCore {
    source: Arc<dyn StatusSource>,
    store: Arc<SharedStore>,
    timing: Mutex<ElapsedTimeTracker>,
    highlights: HighlightTimers,
    clock: Arc<dyn Clock>,
    collection: Mutex<Option<Collection>>,
    pending_actions: Mutex<HashSet<String>>,
    config: TrackerConfig,
}

impl TrackerCore {
    fn collection(&self) -> Option<Collection> {
        lock(&self.collection, "collection").clone()
    }

    fn refreshes_forever(&self) -> bool {
        self.collection()
            .map(|c| c.refreshes_forever())
            .unwrap_or(false)
    }

    fn interval(&self) -> Duration {
        if self.refreshes_forever() {
            self.config.polling.list_interval()
        } else {
            self.config.polling.detail_interval()
        }
    }

    fn timing(&self) -> MutexGuard<'_, ElapsedTimeTracker> {
        lock(&self.timing, "timing")
    }

    /// Merges an entity into the store and records the job transitions it
    /// carries.
    fn merge_entity(&self, entity: Entity, sequence: u64) {
        let Some(previous) = self.store.get(&entity.id) else {
            return;
        };
        let Some(merged) = self.store.apply_update(entity, sequence) else {
            return;
        };

        let now = self.clock.now();
        {
            let mut timing = self.timing();
            for job in &merged.jobs {
                let key = JobKey::new(&merged.id, job.kind);
                timing.on_transition(&key, previous.job_status(job.kind), job, now);
            }
        }

        if merged.just_updated {
            log::info!(
                "{} is now {} (was {})",
                merged.id,
                merged.status,
                previous.status
            );
            self.highlights.schedule(&merged.id);
        }
    }
}

#[async_trait]
impl PollTarget for TrackerCore {
    type Output = Fetched;

    async fn fetch(&self, id: &str) -> Result<Fetched> {
        let kind = match self.store.get(id) {
            Some(entity) => entity.kind,
            None => self
                .collection()
                .map(|c| c.entity_kind())
                .ok_or_else(|| TrackerError::UnknownEntity(id.to_string()))?,
        };

        let sequence = self.store.issue_sequence();
        let raw = self.source.fetch_one(kind, id).await?;
        Ok(Fetched {
            sequence,
            entity: raw.into_entity(id),
        })
    }

    fn is_terminal(&self, output: &Fetched) -> bool {
        !self.refreshes_forever() && output.entity.is_settled()
    }

    fn merge(&self, _id: &str, output: Fetched) {
        self.merge_entity(output.entity, output.sequence);
    }

    fn on_fetch_error(&self, id: &str, error: &TrackerError) {
        log::warn!("Status fetch for {} failed: {}", id, error);

        // The assignment list shows a failed refresh as an error tier.
        if !self.refreshes_forever() {
            return;
        }
        if let Some(current) = self.store.get(id) {
            if current.readiness != Some(ReadinessTier::Error) {
                let mut flagged = Entity::clone(&current);
                flagged.readiness = Some(ReadinessTier::Error);
                self.store.apply_local(flagged);
            }
        }
    }
}

/// Removes the id from the in-flight set when dropped, so a failed action
/// leaves nothing behind.
struct PendingAction<'a> {
    pending: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> PendingAction<'a> {
    fn begin(pending: &'a Mutex<HashSet<String>>, id: &str) -> Option<Self> {
        if !lock(pending, "pending actions").insert(id.to_string()) {
            return None;
        }
        Some(Self {
            pending,
            id: id.to_string(),
        })
    }
}

impl Drop for PendingAction<'_> {
    fn drop(&mut self) {
        lock(self.pending, "pending actions").remove(&self.id);
    }
}

pub struct JobTracker {
    core: Arc<TrackerCore>,
    poller: Poller<TrackerCore>,
}

impl JobTracker {
    pub fn new(source: Arc<dyn StatusSource>, config: TrackerConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn StatusSource>,
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(SharedStore::new(StoreEventBroadcaster::default()));
        let timing = ElapsedTimeTracker::new(
            config.default_durations.clone(),
            config.display.long_running_threshold_secs,
        );
        let highlights = HighlightTimers::new(Arc::clone(&store), config.display.highlight_grace());

        let core = Arc::new(TrackerCore {
            source,
            store,
            timing: Mutex::new(timing),
            highlights,
            clock,
            collection: Mutex::new(None),
            pending_actions: Mutex::new(HashSet::new()),
            config,
        });
        let poller = Poller::new(Arc::clone(&core));

        Self { core, poller }
    }

    /// Loads a whole collection, replacing whatever was tracked before.
    ///
    /// On failure the current collection is left untouched.
    pub async fn load(&self, collection: Collection) -> Result<usize> {
        log::info!("Loading {}", collection);

        let entities = match self.core.source.fetch_list(&collection).await {
            Ok(entities) => entities,
            Err(e) => {
                log::error!("Failed to load {}: {}", collection, e);
                return Err(TrackerError::CollectionLoad {
                    parent: collection.to_string(),
                    message: e.to_string(),
                });
            }
        };

        self.poller.stop();
        self.core.highlights.cancel_all();

        let now = self.core.clock.now();
        {
            let mut timing = self.core.timing();
            timing.clear();
            for entity in &entities {
                for job in &entity.jobs {
                    timing.on_transition(&JobKey::new(&entity.id, job.kind), None, job, now);
                }
            }
        }

        let count = entities.len();
        self.core.store.dispatch(Action::Initialize(entities));
        *lock(&self.core.collection, "collection") = Some(collection);

        log::info!("Loaded {} entities", count);
        Ok(count)
    }

    /// Starts polling the loaded collection.
    ///
    /// Detail collections poll only unsettled entities and stop once all of
    /// them settle; the assignment list refreshes every entity until
    /// stopped. Returns `None` when there is nothing to poll.
    pub fn start_polling(&self) -> Option<PollSession> {
        let refresh_all = self.core.refreshes_forever();
        let ids: Vec<String> = self
            .core
            .store
            .snapshot()
            .iter()
            .filter(|e| refresh_all || !e.is_settled())
            .map(|e| e.id.clone())
            .collect();

        if ids.is_empty() {
            log::info!("Nothing left to poll");
            return None;
        }
        Some(self.poller.start(ids, self.core.interval()))
    }

    /// Requests an immediate poll tick. Returns false when not polling.
    pub fn refresh_now(&self) -> bool {
        self.poller.trigger_now()
    }

    pub fn stop(&self) {
        self.poller.stop();
        self.core.highlights.cancel_all();
    }

    /// Triggers a server action on one entity.
    ///
    /// On success the affected job is moved back into its running state
    /// locally and the entity is polled again. On failure nothing changes.
    pub async fn trigger_action(&self, id: &str, action: ActionParams) -> Result<()> {
        let entity = self
            .core
            .store
            .get(id)
            .ok_or_else(|| TrackerError::UnknownEntity(id.to_string()))?;

        if entity.kind != action.entity_kind() {
            return Err(TrackerError::ActionRejected {
                id: id.to_string(),
                action: action.name().to_string(),
                message: format!("not applicable to {:?} entities", entity.kind),
            });
        }

        let Some(_pending) = PendingAction::begin(&self.core.pending_actions, id) else {
            return Err(TrackerError::ActionRejected {
                id: id.to_string(),
                action: action.name().to_string(),
                message: "an action is already in progress".to_string(),
            });
        };

        let outcome = match self.core.source.trigger_action(id, action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{} for {} failed: {}", action.name(), id, e);
                return Err(e);
            }
        };
        if !outcome.success {
            let message = outcome
                .message
                .unwrap_or_else(|| "rejected by server".to_string());
            log::warn!("{} for {} rejected: {}", action.name(), id, message);
            return Err(TrackerError::ActionRejected {
                id: id.to_string(),
                action: action.name().to_string(),
                message,
            });
        }

        let kind = action.job_kind();
        let Some(current) = self.core.store.get(id) else {
            log::info!("{} was removed while {} was in flight", id, action.name());
            return Ok(());
        };
        let mut running = Entity::clone(&current);
        running.set_job_status(kind, kind.running_status());

        self.core
            .timing()
            .restart(&JobKey::new(id, kind), self.core.clock.now());
        if let Some(merged) = self.core.store.apply_local(running) {
            if merged.just_updated {
                self.core.highlights.schedule(id);
            }
        }

        log::info!("{} accepted for {}, polling again", action.name(), id);
        self.poller.readmit(id, self.core.interval());
        Ok(())
    }

    /// Stops tracking one entity. Returns false when it was not tracked.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.core.store.dispatch(Action::Delete(id.to_string())).is_some();
        self.core.timing().forget(id);
        self.core.highlights.cancel(id);
        self.poller.forget(id);
        removed
    }

    pub fn collection(&self) -> Option<Collection> {
        self.core.collection()
    }

    pub fn entities(&self) -> Vec<Arc<Entity>> {
        self.core.store.snapshot()
    }

    pub fn entity(&self, id: &str) -> Option<Arc<Entity>> {
        self.core.store.get(id)
    }

    pub fn progress(&self, id: &str) -> Option<u8> {
        self.entity(id).map(|e| views::entity_progress(&e))
    }

    pub fn readiness(&self, id: &str) -> Option<ReadinessTier> {
        self.entity(id).map(|e| views::entity_readiness(&e))
    }

    pub fn stats(&self) -> Stats {
        views::stats_for(&self.core.store.snapshot())
    }

    pub fn label(&self, id: &str, kind: JobKind) -> Option<ElapsedLabel> {
        let entity = self.entity(id)?;
        let job = entity.job(kind)?;
        self.core
            .timing()
            .elapsed_label(&JobKey::new(id, kind), job, self.core.clock.now())
    }

    /// Labels of every job of one entity that is running or completed.
    pub fn labels(&self, id: &str) -> Vec<(JobKind, ElapsedLabel)> {
        let Some(entity) = self.entity(id) else {
            return Vec::new();
        };
        let now = self.core.clock.now();
        let mut timing = self.core.timing();
        entity
            .jobs
            .iter()
            .filter_map(|job| {
                timing
                    .elapsed_label(&JobKey::new(id, job.kind), job, now)
                    .map(|label| (job.kind, label))
            })
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.core.store.subscribe()
    }

    pub fn session(&self) -> Option<PollSession> {
        self.poller.session()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Tracker {} lock was poisoned, recovering", what);
        poisoned.into_inner()
    })
}
