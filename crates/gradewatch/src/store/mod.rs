//! Local mirror of backend entities.
//!
//! The collection is changed only through the four reducer actions; the
//! shared store adds locking, change events and stale-result rejection.

pub mod entity;
pub mod events;
pub mod highlight;
pub mod reducer;
pub mod shared;

pub use entity::{Entity, EntityKind};
pub use events::{StoreChange, StoreEvent, StoreEventBroadcaster};
pub use highlight::HighlightTimers;
pub use reducer::{reduce, Action};
pub use shared::SharedStore;
