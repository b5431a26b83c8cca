//! Canonical job statuses and the normalizer that produces them.

pub mod job;
pub mod normalize;
pub mod payload;

pub use job::{DocumentKind, Job, JobKind, JobStatus, OrchestrationSummary, ReadinessTier};
pub use normalize::{
    normalize, normalize_assignment, normalize_submission, parse_document_status, parse_readiness,
};
pub use payload::{RawAssignmentStatus, RawStatusPayload};
