//! Maps raw status payloads onto canonical job statuses and entities.
//!
//! All functions here are pure and total: unknown or missing values fall
//! back to a safe default instead of failing.

use super::job::{Job, JobKind, JobStatus, ReadinessTier};
use super::payload::{RawAssignmentStatus, RawStatusPayload};
use crate::store::Entity;

/// Resolves the canonical evaluation status of a payload.
///
/// Precedence:
/// 1. fine-grained field `completed` gives `completed`;
/// 2. fine-grained field `failed` gives `failed`;
/// 3. fine-grained `pending` while the coarse field is `completed` gives
///    `evaluating` (upstream processing finished, evaluation not yet);
/// 4. otherwise the coarse field, or `pending` when it is absent.
pub fn normalize(raw: &RawStatusPayload) -> JobStatus {
    let fine = raw.primary_status.as_deref().map(str::trim);
    let coarse = raw.secondary_status.as_deref().map(str::trim);

    match (fine, coarse) {
        (Some("completed"), _) => JobStatus::Completed,
        (Some("failed"), _) => JobStatus::Failed,
        (Some("pending"), Some("completed")) => JobStatus::Evaluating,
        (_, coarse) => parse_evaluation_status(coarse, raw.id.as_deref().unwrap_or("?")),
    }
}

/// Parses a status string in the evaluation domain.
///
/// A coarse `processing` value means evaluation work is underway and is
/// reported as `evaluating`.
fn parse_evaluation_status(value: Option<&str>, entity_id: &str) -> JobStatus {
    match value {
        None => JobStatus::Pending,
        Some("pending") => JobStatus::Pending,
        Some("processing") | Some("evaluating") => JobStatus::Evaluating,
        Some("completed") => JobStatus::Completed,
        Some("failed") => JobStatus::Failed,
        Some(other) => {
            log::warn!(
                "Unknown evaluation status '{}' for {}, defaulting to pending",
                other,
                entity_id
            );
            JobStatus::Pending
        }
    }
}

/// Parses a document or orchestration status string.
///
/// `None` yields `absent`; unrecognized values yield `pending`.
pub fn parse_document_status(value: Option<&str>, absent: JobStatus, entity_id: &str) -> JobStatus {
    match value.map(str::trim) {
        None => absent,
        Some("pending") => JobStatus::Pending,
        Some("processing") => JobStatus::Processing,
        Some("completed") => JobStatus::Completed,
        Some("failed") => JobStatus::Failed,
        Some("not_applicable") => JobStatus::NotApplicable,
        Some("not_needed") => JobStatus::NotNeeded,
        Some(other) => {
            log::warn!(
                "Unknown processing status '{}' for {}, defaulting to pending",
                other,
                entity_id
            );
            JobStatus::Pending
        }
    }
}

pub fn parse_readiness(value: Option<&str>) -> Option<ReadinessTier> {
    match value.map(str::trim)? {
        "ready" => Some(ReadinessTier::Ready),
        "partial" => Some(ReadinessTier::Partial),
        "not_ready" => Some(ReadinessTier::NotReady),
        "error" => Some(ReadinessTier::Error),
        other => {
            log::warn!("Unknown readiness '{}', ignoring", other);
            None
        }
    }
}

/// Builds a submission entity from its per-id payload.
pub fn normalize_submission(id: &str, raw: &RawStatusPayload) -> Entity {
    let status = normalize(raw);

    let mut entity = Entity::submission(id, status);
    entity.jobs = vec![Job::new(JobKind::Evaluation, status)
        .with_error(raw.error_message().map(String::from))
        .with_processing_time(raw.processing_time_seconds)];
    entity.name = raw.student_name.clone();
    entity.total_possible = raw.total_possible;
    entity.score = match (raw.primary_status.as_deref(), raw.overall_grade) {
        (Some("completed"), Some(grade)) => Some(grade),
        _ => raw.score,
    };
    entity
}

/// Builds an assignment entity from its status payload.
///
/// Rubric and solution jobs default to `not_applicable` and orchestration
/// to `not_needed` when the payload does not mention them.
pub fn normalize_assignment(id: &str, raw: &RawAssignmentStatus) -> Entity {
    let document = |value: Option<&String>, absent: JobStatus| {
        parse_document_status(value.map(String::as_str), absent, id)
    };

    let jobs = vec![
        Job::new(
            JobKind::ASSIGNMENT,
            document(raw.assignment_status.as_ref(), JobStatus::Pending),
        )
        .with_error(raw.processing_error.clone())
        .with_processing_time(raw.assignment_processing_time),
        Job::new(
            JobKind::RUBRIC,
            document(raw.rubric_status.as_ref(), JobStatus::NotApplicable),
        )
        .with_error(raw.rubric_processing_error.clone())
        .with_processing_time(raw.rubric_processing_time),
        Job::new(
            JobKind::SOLUTION,
            document(raw.solution_status.as_ref(), JobStatus::NotApplicable),
        )
        .with_error(raw.solution_processing_error.clone())
        .with_processing_time(raw.solution_processing_time),
        Job::new(
            JobKind::Orchestration,
            document(raw.orchestration_status.as_ref(), JobStatus::NotNeeded),
        )
        .with_error(raw.orchestration_error.clone())
        .with_processing_time(raw.orchestration_processing_time),
    ];

    let mut entity = Entity::assignment(id, jobs);
    entity.name = raw.title.clone();
    entity.readiness = parse_readiness(raw.evaluation_ready_status.as_deref());
    entity.orchestration = raw.orchestration_data.clone();
    entity
}
