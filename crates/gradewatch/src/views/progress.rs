//! Completion percentage and readiness tiering.

use crate::status::{Job, JobKind, JobStatus, ReadinessTier};
use crate::store::Entity;

/// Composite completion percentage of an entity's jobs.
///
/// The primary job always counts. Other document jobs count unless
/// `not_applicable`. Orchestration counts only once it has started, that is
/// when it is neither `not_needed` nor `pending`.
pub fn progress(primary: JobKind, jobs: &[Job]) -> u8 {
    let mut applicable = 1u32;
    let mut completed = 0u32;

    for job in jobs {
        let counts = if job.kind == primary {
            true
        } else {
            match job.kind {
                JobKind::Orchestration => {
                    !matches!(job.status, JobStatus::NotNeeded | JobStatus::Pending)
                }
                _ => job.status != JobStatus::NotApplicable,
            }
        };
        if !counts {
            continue;
        }
        if job.kind != primary {
            applicable += 1;
        }
        if job.status == JobStatus::Completed {
            completed += 1;
        }
    }

    let percent = (100.0 * completed as f64 / applicable as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

pub fn entity_progress(entity: &Entity) -> u8 {
    progress(entity.kind.primary_job(), &entity.jobs)
}

/// Readiness derived from job statuses.
///
/// Required jobs are the primary job and every applicable optional document
/// job. A running orchestration keeps an otherwise ready entity `partial`.
pub fn readiness(primary: JobKind, jobs: &[Job]) -> ReadinessTier {
    let required: Vec<&Job> = jobs
        .iter()
        .filter(|job| {
            job.kind == primary
                || (job.kind != JobKind::Orchestration && job.status != JobStatus::NotApplicable)
        })
        .collect();

    if required.iter().any(|job| job.status == JobStatus::Failed) {
        return ReadinessTier::Error;
    }

    let primary_completed = jobs
        .iter()
        .any(|job| job.kind == primary && job.status == JobStatus::Completed);
    if !primary_completed {
        return ReadinessTier::NotReady;
    }

    let all_completed = required.iter().all(|job| job.status == JobStatus::Completed);
    let orchestrating = jobs
        .iter()
        .any(|job| job.kind == JobKind::Orchestration && job.status.is_running());

    if all_completed && !orchestrating {
        ReadinessTier::Ready
    } else {
        ReadinessTier::Partial
    }
}

/// Readiness reported by the backend, or derived locally when absent.
pub fn entity_readiness(entity: &Entity) -> ReadinessTier {
    entity
        .readiness
        .unwrap_or_else(|| readiness(entity.kind.primary_job(), &entity.jobs))
}
