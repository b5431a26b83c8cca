//! Pure read views derived from the entity collection.

pub mod progress;
pub mod stats;

pub use progress::{entity_progress, entity_readiness, progress, readiness};
pub use stats::{stats, stats_for, Stats};
