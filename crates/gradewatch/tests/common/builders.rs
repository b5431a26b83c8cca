//! Builders for entities and raw payloads.

#![allow(dead_code)]

use gradewatch::source::RawStatus;
use gradewatch::status::{RawAssignmentStatus, RawStatusPayload};
use gradewatch::{Entity, Job, JobKind, JobStatus, TrackerConfig};

/// Tracker config for tests; the base URL is never contacted.
pub fn test_config() -> TrackerConfig {
    TrackerConfig::with_base_url("http://grader.invalid")
}

pub fn submission(id: &str, status: JobStatus) -> Entity {
    Entity::submission(id, status)
}

pub fn graded_submission(id: &str, score: f64) -> Entity {
    let mut entity = Entity::submission(id, JobStatus::Completed);
    entity.score = Some(score);
    entity
}

/// Assignment with jobs in order assignment, rubric, solution, orchestration.
pub fn assignment(id: &str, statuses: [JobStatus; 4]) -> Entity {
    let [assignment, rubric, solution, orchestration] = statuses;
    Entity::assignment(
        id,
        vec![
            Job::new(JobKind::ASSIGNMENT, assignment),
            Job::new(JobKind::RUBRIC, rubric),
            Job::new(JobKind::SOLUTION, solution),
            Job::new(JobKind::Orchestration, orchestration),
        ],
    )
}

/// Builder for per-id submission payloads.
#[derive(Default)]
pub struct PayloadBuilder {
    raw: RawStatusPayload,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fine-grained evaluation field.
    pub fn primary(mut self, status: &str) -> Self {
        self.raw.primary_status = Some(status.to_string());
        self
    }

    /// Set the coarse processing field.
    pub fn secondary(mut self, status: &str) -> Self {
        self.raw.secondary_status = Some(status.to_string());
        self
    }

    pub fn grade(mut self, grade: f64) -> Self {
        self.raw.overall_grade = Some(grade);
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.raw.error = Some(message.to_string());
        self
    }

    pub fn processing_time(mut self, secs: f64) -> Self {
        self.raw.processing_time_seconds = Some(secs);
        self
    }

    pub fn build(self) -> RawStatus {
        RawStatus::Submission(self.raw)
    }
}

/// Shorthand for an evaluation that is still running.
pub fn evaluating() -> RawStatus {
    PayloadBuilder::new()
        .primary("pending")
        .secondary("completed")
        .build()
}

pub fn completed_with(grade: f64) -> RawStatus {
    PayloadBuilder::new().primary("completed").grade(grade).build()
}

pub fn failed(message: &str) -> RawStatus {
    PayloadBuilder::new().primary("failed").error(message).build()
}

/// Builder for assignment status payloads.
#[derive(Default)]
pub struct AssignmentStatusBuilder {
    raw: RawAssignmentStatus,
}

impl AssignmentStatusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment(mut self, status: &str) -> Self {
        self.raw.assignment_status = Some(status.to_string());
        self
    }

    pub fn rubric(mut self, status: &str) -> Self {
        self.raw.rubric_status = Some(status.to_string());
        self
    }

    pub fn solution(mut self, status: &str) -> Self {
        self.raw.solution_status = Some(status.to_string());
        self
    }

    pub fn orchestration(mut self, status: &str) -> Self {
        self.raw.orchestration_status = Some(status.to_string());
        self
    }

    pub fn readiness(mut self, tier: &str) -> Self {
        self.raw.evaluation_ready_status = Some(tier.to_string());
        self
    }

    pub fn build(self) -> RawStatus {
        RawStatus::Assignment(self.raw)
    }
}
