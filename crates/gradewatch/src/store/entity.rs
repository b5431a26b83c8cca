use serde::{Deserialize, Serialize};

use crate::status::{Job, JobKind, JobStatus, OrchestrationSummary, ReadinessTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An assignment/project whose documents are ingested and orchestrated.
    Assignment,
    /// A student submission that gets evaluated.
    Submission,
}

impl EntityKind {
    /// The job whose status is mirrored into [`Entity::status`].
    pub fn primary_job(self) -> JobKind {
        match self {
            EntityKind::Assignment => JobKind::ASSIGNMENT,
            EntityKind::Submission => JobKind::Evaluation,
        }
    }
}

/// Local mirror of a backend entity and the jobs it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Status of the primary job.
    pub status: JobStatus,
    pub jobs: Vec<Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_possible: Option<f64>,
    /// Readiness as reported by the backend, when it reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestration: Option<OrchestrationSummary>,
    /// Highlight flag set by a merge that changed status or score.
    #[serde(default)]
    pub just_updated: bool,
}

impl Entity {
    pub fn submission(id: &str, status: JobStatus) -> Self {
        Self {
            id: id.to_string(),
            kind: EntityKind::Submission,
            name: None,
            status,
            jobs: vec![Job::new(JobKind::Evaluation, status)],
            score: None,
            total_possible: None,
            readiness: None,
            orchestration: None,
            just_updated: false,
        }
    }

    /// Creates an assignment from its jobs. The assignment document job is
    /// added as `pending` if `jobs` does not contain one.
    pub fn assignment(id: &str, mut jobs: Vec<Job>) -> Self {
        if !jobs.iter().any(|j| j.kind == JobKind::ASSIGNMENT) {
            jobs.insert(0, Job::new(JobKind::ASSIGNMENT, JobStatus::Pending));
        }
        let status = jobs
            .iter()
            .find(|j| j.kind == JobKind::ASSIGNMENT)
            .map(|j| j.status)
            .unwrap_or(JobStatus::Pending);

        Self {
            id: id.to_string(),
            kind: EntityKind::Assignment,
            name: None,
            status,
            jobs,
            score: None,
            total_possible: None,
            readiness: None,
            orchestration: None,
            just_updated: false,
        }
    }

    pub fn job(&self, kind: JobKind) -> Option<&Job> {
        self.jobs.iter().find(|j| j.kind == kind)
    }

    pub fn job_status(&self, kind: JobKind) -> Option<JobStatus> {
        self.job(kind).map(|j| j.status)
    }

    /// Sets the status of one job, inserting the job if missing, and keeps
    /// the headline status in step with the primary job.
    ///
    /// Returns false and changes nothing when `status` is outside the job
    /// kind's state machine.
    pub fn set_job_status(&mut self, kind: JobKind, status: JobStatus) -> bool {
        if !kind.accepts(status) {
            log::warn!("{} cannot enter {} on {}", kind, status, self.id);
            return false;
        }
        match self.jobs.iter_mut().find(|j| j.kind == kind) {
            Some(job) => {
                job.status = status;
                if status != JobStatus::Failed {
                    job.error = None;
                }
            }
            None => self.jobs.push(Job::new(kind, status)),
        }
        if kind == self.kind.primary_job() {
            self.status = status;
        }
        true
    }

    /// True once nothing about this entity is expected to change without
    /// a new user action.
    ///
    /// Assignments treat an orchestration job that is still `pending` as
    /// settled: orchestration only counts once it has been started.
    pub fn is_settled(&self) -> bool {
        match self.kind {
            EntityKind::Submission => self.status.is_terminal(),
            EntityKind::Assignment => self.jobs.iter().all(|job| match job.kind {
                JobKind::Orchestration => {
                    job.status.is_terminal() || job.status == JobStatus::Pending
                }
                _ => job.status.is_terminal(),
            }),
        }
    }
}
