//! Shared test utilities for gradewatch integration tests.
//!
//! This module provides:
//! - `MockSource`, a scripted in-memory `StatusSource`
//! - Builders for entities and raw status payloads

pub mod builders;
pub mod mock_source;

pub use builders::*;
pub use mock_source::MockSource;
