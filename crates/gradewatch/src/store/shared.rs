//! Shared entity store with change broadcasting and stale-merge protection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use super::entity::Entity;
use super::events::{StoreChange, StoreEvent, StoreEventBroadcaster};
use super::reducer::{reduce, Action};

#[derive(Default)]
struct StoreState {
    entities: Vec<Arc<Entity>>,
    /// Sequence of the last merge applied per id.
    applied: HashMap<String, u64>,
    revision: u64,
}

/// The single shared entity collection.
///
/// All mutations go through [`SharedStore::dispatch`] or
/// [`SharedStore::apply_update`]. Readers get `Arc` snapshots and never hold
/// the lock.
pub struct SharedStore {
    state: RwLock<StoreState>,
    sequence: AtomicU64,
    events: StoreEventBroadcaster,
}

impl SharedStore {
    pub fn new(events: StoreEventBroadcaster) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            sequence: AtomicU64::new(0),
            events,
        }
    }

    /// Issues the next fetch sequence number. Stamp a fetch with this when it
    /// is sent, not when it resolves.
    pub fn issue_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Applies an action. Returns the change, or `None` for a no-op.
    pub fn dispatch(&self, action: Action) -> Option<StoreChange> {
        let mut state = self.write();
        let change = Self::apply(&mut state, action)?;
        Some(self.publish(&mut state, change))
    }

    /// Merges a fetched entity stamped with `sequence`.
    ///
    /// Returns the stored entity after the merge, or `None` when the entity
    /// is not in the collection or a newer result was already applied.
    pub fn apply_update(&self, entity: Entity, sequence: u64) -> Option<Arc<Entity>> {
        let mut state = self.write();
        let id = entity.id.clone();

        if let Some(&last) = state.applied.get(&id) {
            if sequence < last {
                log::debug!(
                    "Dropping stale result for {} (sequence {} < {})",
                    id,
                    sequence,
                    last
                );
                return None;
            }
        }

        let change = Self::apply(&mut state, Action::UpdateSingle(entity))?;
        state.applied.insert(id.clone(), sequence);
        self.publish(&mut state, change);
        state.entities.iter().find(|e| e.id == id).cloned()
    }

    /// Merges an entity built locally, ordered after every fetch issued so far.
    pub fn apply_local(&self, entity: Entity) -> Option<Arc<Entity>> {
        let sequence = self.issue_sequence();
        self.apply_update(entity, sequence)
    }

    pub fn snapshot(&self) -> Vec<Arc<Entity>> {
        self.read().entities.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Entity>> {
        self.read().entities.iter().find(|e| e.id == id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().entities.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn apply(state: &mut StoreState, action: Action) -> Option<StoreChange> {
        let change = match &action {
            Action::Initialize(entities) => StoreChange::Initialized {
                count: entities.len(),
            },
            Action::UpdateSingle(entity) => {
                if !state.entities.iter().any(|e| e.id == entity.id) {
                    log::debug!("Ignoring update for unknown entity {}", entity.id);
                    return None;
                }
                StoreChange::Updated {
                    id: entity.id.clone(),
                    just_updated: false,
                }
            }
            Action::ClearHighlight(id) => {
                if !state.entities.iter().any(|e| &e.id == id && e.just_updated) {
                    return None;
                }
                StoreChange::HighlightCleared { id: id.clone() }
            }
            Action::Delete(id) => {
                if !state.entities.iter().any(|e| &e.id == id) {
                    return None;
                }
                StoreChange::Deleted { id: id.clone() }
            }
        };

        state.entities = reduce(&state.entities, action);

        Some(match change {
            StoreChange::Initialized { count } => {
                let entities = &state.entities;
                state.applied.retain(|id, _| entities.iter().any(|e| &e.id == id));
                StoreChange::Initialized { count }
            }
            StoreChange::Updated { id, .. } => {
                let just_updated = state
                    .entities
                    .iter()
                    .any(|e| e.id == id && e.just_updated);
                StoreChange::Updated { id, just_updated }
            }
            StoreChange::Deleted { id } => {
                state.applied.remove(&id);
                StoreChange::Deleted { id }
            }
            other => other,
        })
    }

    fn publish(&self, state: &mut StoreState, change: StoreChange) -> StoreChange {
        state.revision += 1;
        self.events.send(StoreEvent::new(state.revision, change.clone()));
        change
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Entity store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Entity store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(StoreEventBroadcaster::default())
    }
}
