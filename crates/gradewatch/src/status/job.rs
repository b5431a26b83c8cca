//! Canonical job model shared by the normalizer, store and views.

use serde::{Deserialize, Serialize};

/// Canonical status of a single job.
///
/// Document and orchestration jobs use every variant except `Evaluating`;
/// evaluation jobs use `Pending`, `Evaluating`, `Completed` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Evaluating,
    Completed,
    Failed,
    NotApplicable,
    NotNeeded,
}

impl JobStatus {
    /// Server-side work is in flight.
    pub fn is_running(self) -> bool {
        matches!(self, JobStatus::Processing | JobStatus::Evaluating)
    }

    /// No further transition is expected within a polling session.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::NotApplicable | JobStatus::NotNeeded
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Evaluating => "evaluating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::NotApplicable => "not_applicable",
            JobStatus::NotNeeded => "not_needed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which uploaded document a processing job ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Assignment,
    Rubric,
    Solution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Document(DocumentKind),
    Orchestration,
    Evaluation,
}

impl JobKind {
    pub const ASSIGNMENT: JobKind = JobKind::Document(DocumentKind::Assignment);
    pub const RUBRIC: JobKind = JobKind::Document(DocumentKind::Rubric);
    pub const SOLUTION: JobKind = JobKind::Document(DocumentKind::Solution);

    /// Status a job of this kind enters when work starts.
    pub fn running_status(self) -> JobStatus {
        match self {
            JobKind::Evaluation => JobStatus::Evaluating,
            _ => JobStatus::Processing,
        }
    }

    /// Whether `status` belongs to this kind's state machine.
    pub fn accepts(self, status: JobStatus) -> bool {
        match self {
            JobKind::Evaluation => matches!(
                status,
                JobStatus::Pending | JobStatus::Evaluating | JobStatus::Completed | JobStatus::Failed
            ),
            _ => status != JobStatus::Evaluating,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Document(DocumentKind::Assignment) => write!(f, "assignment"),
            JobKind::Document(DocumentKind::Rubric) => write!(f, "rubric"),
            JobKind::Document(DocumentKind::Solution) => write!(f, "solution"),
            JobKind::Orchestration => write!(f, "orchestration"),
            JobKind::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// One trackable unit of server-side work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub kind: JobKind,
    pub status: JobStatus,
    /// Set only while `status == Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration reported by the server, used as a label fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_secs: Option<f64>,
}

impl Job {
    pub fn new(kind: JobKind, status: JobStatus) -> Self {
        Self {
            kind,
            status,
            error: None,
            processing_time_secs: None,
        }
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = if self.status == JobStatus::Failed {
            error
        } else {
            None
        };
        self
    }

    pub fn with_processing_time(mut self, secs: Option<f64>) -> Self {
        self.processing_time_secs = secs;
        self
    }
}

/// Coarse rollup of whether an entity is usable for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessTier {
    NotReady,
    Partial,
    Ready,
    Error,
}

impl ReadinessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessTier::NotReady => "not_ready",
            ReadinessTier::Partial => "partial",
            ReadinessTier::Ready => "ready",
            ReadinessTier::Error => "error",
        }
    }
}

impl std::fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation summary produced by a cross-document orchestration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationSummary {
    pub completeness_score: i64,
    pub is_valid: bool,
    pub issues_count: i64,
    pub recommendations_count: i64,
    pub has_warnings: bool,
}
