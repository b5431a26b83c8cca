//! The collaborator that owns the real job state.

pub mod http;

pub use http::HttpStatusSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::status::{
    normalize_assignment, normalize_submission, JobKind, RawAssignmentStatus, RawStatusPayload,
};
use crate::store::{Entity, EntityKind};

/// A collection that can be loaded as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Collection {
    /// Every submission of one assignment.
    Submissions { assignment_id: String },
    /// A single assignment and its processing jobs.
    Assignment { id: String },
    /// All assignments.
    Assignments,
}

impl Collection {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Collection::Submissions { .. } => EntityKind::Submission,
            Collection::Assignment { .. } | Collection::Assignments => EntityKind::Assignment,
        }
    }

    /// Whether entities of this collection keep being refreshed after they
    /// settle.
    pub fn refreshes_forever(&self) -> bool {
        matches!(self, Collection::Assignments)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Submissions { assignment_id } => {
                write!(f, "submissions of {}", assignment_id)
            }
            Collection::Assignment { id } => write!(f, "assignment {}", id),
            Collection::Assignments => write!(f, "assignments"),
        }
    }
}

/// Raw per-id status, tagged by entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStatus {
    Submission(RawStatusPayload),
    Assignment(RawAssignmentStatus),
}

impl RawStatus {
    pub fn into_entity(self, id: &str) -> Entity {
        match self {
            RawStatus::Submission(raw) => normalize_submission(id, &raw),
            RawStatus::Assignment(raw) => normalize_assignment(id, &raw),
        }
    }
}

/// User-initiated server action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionParams {
    /// Re-evaluates a submission.
    RerunEvaluation,
    /// Re-runs cross-document orchestration of an assignment.
    RerunOrchestration { force_reread: bool },
}

impl ActionParams {
    /// Entity kind the action applies to.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            ActionParams::RerunEvaluation => EntityKind::Submission,
            ActionParams::RerunOrchestration { .. } => EntityKind::Assignment,
        }
    }

    /// Job moved back into a running state when the action succeeds.
    pub fn job_kind(self) -> JobKind {
        match self {
            ActionParams::RerunEvaluation => JobKind::Evaluation,
            ActionParams::RerunOrchestration { .. } => JobKind::Orchestration,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionParams::RerunEvaluation => "rerun_evaluation",
            ActionParams::RerunOrchestration { .. } => "rerun_orchestration",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_list(&self, collection: &Collection) -> Result<Vec<Entity>>;

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<RawStatus>;

    async fn trigger_action(&self, id: &str, action: ActionParams) -> Result<ActionOutcome>;
}
