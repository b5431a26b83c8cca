//! Pure reducer over the entity collection.
//!
//! Entities are held behind `Arc` so an action that touches one entity hands
//! every other entity back by reference.

use std::sync::Arc;

use super::entity::Entity;

/// A mutation of the entity collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replaces the whole collection. No highlight survives.
    Initialize(Vec<Entity>),
    /// Merges a fresh copy of one entity. Never inserts.
    UpdateSingle(Entity),
    /// Clears the highlight flag of one entity.
    ClearHighlight(String),
    /// Removes one entity.
    Delete(String),
}

pub fn reduce(state: &[Arc<Entity>], action: Action) -> Vec<Arc<Entity>> {
    match action {
        Action::Initialize(entities) => entities
            .into_iter()
            .map(|mut entity| {
                entity.just_updated = false;
                Arc::new(entity)
            })
            .collect(),

        Action::UpdateSingle(incoming) => state
            .iter()
            .map(|current| {
                if current.id == incoming.id {
                    Arc::new(merge(current, incoming.clone()))
                } else {
                    Arc::clone(current)
                }
            })
            .collect(),

        Action::ClearHighlight(id) => state
            .iter()
            .map(|current| {
                if current.id == id && current.just_updated {
                    let mut cleared = Entity::clone(current);
                    cleared.just_updated = false;
                    Arc::new(cleared)
                } else {
                    Arc::clone(current)
                }
            })
            .collect(),

        Action::Delete(id) => state
            .iter()
            .filter(|current| current.id != id)
            .cloned()
            .collect(),
    }
}

/// Overlays `incoming` on `current`.
///
/// Descriptive fields missing from a per-id payload keep their previous
/// value; status and score always come from `incoming`.
fn merge(current: &Entity, mut incoming: Entity) -> Entity {
    incoming.just_updated = current.status != incoming.status || current.score != incoming.score;

    if incoming.name.is_none() {
        incoming.name = current.name.clone();
    }
    if incoming.total_possible.is_none() {
        incoming.total_possible = current.total_possible;
    }
    if incoming.orchestration.is_none() {
        incoming.orchestration = current.orchestration.clone();
    }
    incoming
}
