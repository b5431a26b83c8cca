//! Per-job elapsed time and frozen completion durations.
//!
//! A job's completion duration is computed once, the first time it is seen
//! `completed`, and never recomputed afterwards. Re-polling a finished job
//! must not change what the user sees.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DefaultDurations;
use crate::status::{Job, JobKind, JobStatus};

/// Identifies one job of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobKey {
    pub entity_id: String,
    pub kind: JobKind,
}

impl JobKey {
    pub fn new(entity_id: &str, kind: JobKind) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            kind,
        }
    }
}

/// Timing label for a job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ElapsedLabel {
    /// Live elapsed time; recomputed on every request.
    Running { elapsed_secs: f64, long_running: bool },
    /// Frozen duration of a completed job.
    Completed { duration_secs: f64 },
}

impl std::fmt::Display for ElapsedLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElapsedLabel::Running { elapsed_secs, .. } => {
                write!(f, "Processing for {:.0}s...", elapsed_secs)
            }
            ElapsedLabel::Completed { duration_secs } => {
                write!(f, "Processed in {:.1}s", duration_secs)
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
struct JobTiming {
    started_at: Option<DateTime<Utc>>,
    /// Write-once.
    completed_secs: Option<f64>,
}

pub struct ElapsedTimeTracker {
    timings: HashMap<JobKey, JobTiming>,
    defaults: DefaultDurations,
    long_running_threshold_secs: f64,
}

impl ElapsedTimeTracker {
    pub fn new(defaults: DefaultDurations, long_running_threshold_secs: u64) -> Self {
        Self {
            timings: HashMap::new(),
            defaults,
            long_running_threshold_secs: long_running_threshold_secs as f64,
        }
    }

    /// Records the effect of a status change observed at `now`.
    ///
    /// `previous` is `None` when the job is seen for the first time.
    pub fn on_transition(
        &mut self,
        key: &JobKey,
        previous: Option<JobStatus>,
        job: &Job,
        now: DateTime<Utc>,
    ) {
        let was_running = previous.map(JobStatus::is_running).unwrap_or(false);

        if job.status.is_running() && !was_running {
            log::debug!("{} {} started at {}", key.entity_id, key.kind, now);
            self.timings.entry(key.clone()).or_default().started_at = Some(now);
        }

        if job.status == JobStatus::Completed {
            self.freeze(key, job, now);
        }
    }

    /// Returns the label for `job`, or `None` when it is neither running
    /// nor completed.
    pub fn elapsed_label(
        &mut self,
        key: &JobKey,
        job: &Job,
        now: DateTime<Utc>,
    ) -> Option<ElapsedLabel> {
        if job.status.is_running() {
            let timing = self.timings.entry(key.clone()).or_default();
            let started_at = *timing.started_at.get_or_insert(now);
            let elapsed_secs = seconds_between(started_at, now);
            return Some(ElapsedLabel::Running {
                elapsed_secs,
                long_running: elapsed_secs > self.long_running_threshold_secs,
            });
        }

        if let Some(duration_secs) = self.timings.get(key).and_then(|t| t.completed_secs) {
            return Some(ElapsedLabel::Completed { duration_secs });
        }

        if job.status == JobStatus::Completed {
            let duration_secs = self.freeze(key, job, now);
            return Some(ElapsedLabel::Completed { duration_secs });
        }

        None
    }

    /// Starts a new lifecycle for a job that is being re-run: the frozen
    /// duration is discarded and the start time reset to `now`.
    pub fn restart(&mut self, key: &JobKey, now: DateTime<Utc>) {
        self.timings.insert(
            key.clone(),
            JobTiming {
                started_at: Some(now),
                completed_secs: None,
            },
        );
    }

    /// Drops all timing state of one entity.
    pub fn forget(&mut self, entity_id: &str) {
        self.timings.retain(|key, _| key.entity_id != entity_id);
    }

    /// Drops all timing state.
    pub fn clear(&mut self) {
        self.timings.clear();
    }

    pub fn started_at(&self, key: &JobKey) -> Option<DateTime<Utc>> {
        self.timings.get(key).and_then(|t| t.started_at)
    }

    fn freeze(&mut self, key: &JobKey, job: &Job, now: DateTime<Utc>) -> f64 {
        let fallback = job
            .processing_time_secs
            .unwrap_or_else(|| self.defaults.for_kind(key.kind));
        let timing = self.timings.entry(key.clone()).or_default();
        let started_at = timing.started_at;

        *timing.completed_secs.get_or_insert_with(|| {
            let secs = started_at
                .map(|start| seconds_between(start, now))
                .unwrap_or(fallback);
            log::debug!("{} {} completed in {:.1}s", key.entity_id, key.kind, secs);
            secs
        })
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    ((end - start).num_milliseconds() as f64 / 1000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    fn tracker() -> ElapsedTimeTracker {
        ElapsedTimeTracker::new(DefaultDurations::default(), 10)
    }

    #[test]
    fn test_completed_duration_is_frozen() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::RUBRIC);
        let running = Job::new(JobKind::RUBRIC, JobStatus::Processing);
        let done = Job::new(JobKind::RUBRIC, JobStatus::Completed);

        tracker.on_transition(&key, Some(JobStatus::Pending), &running, t0());
        tracker.on_transition(
            &key,
            Some(JobStatus::Processing),
            &done,
            t0() + Duration::seconds(5),
        );

        let later = t0() + Duration::seconds(40);
        tracker.on_transition(&key, Some(JobStatus::Completed), &done, later);
        let label = tracker.elapsed_label(&key, &done, later).unwrap();
        assert_eq!(label, ElapsedLabel::Completed { duration_secs: 5.0 });
        assert_eq!(label.to_string(), "Processed in 5.0s");
    }

    #[test]
    fn test_frozen_label_survives_lost_start() {
        let mut tracker = tracker();
        let key = JobKey::new("s1", JobKind::Evaluation);
        let running = Job::new(JobKind::Evaluation, JobStatus::Evaluating);
        let done = Job::new(JobKind::Evaluation, JobStatus::Completed).with_processing_time(Some(99.0));

        tracker.on_transition(&key, None, &running, t0());
        tracker.on_transition(&key, Some(JobStatus::Evaluating), &done, t0() + Duration::seconds(3));

        // The server later reports a different duration; nothing changes.
        let label = tracker
            .elapsed_label(&key, &done, t0() + Duration::seconds(300))
            .unwrap();
        assert_eq!(label.to_string(), "Processed in 3.0s");
    }

    #[test]
    fn test_running_label_is_live() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::ASSIGNMENT);
        let running = Job::new(JobKind::ASSIGNMENT, JobStatus::Processing);

        tracker.on_transition(&key, Some(JobStatus::Pending), &running, t0());

        let first = tracker
            .elapsed_label(&key, &running, t0() + Duration::seconds(4))
            .unwrap();
        assert_eq!(first.to_string(), "Processing for 4s...");
        assert!(matches!(first, ElapsedLabel::Running { long_running: false, .. }));

        let second = tracker
            .elapsed_label(&key, &running, t0() + Duration::seconds(12))
            .unwrap();
        assert_eq!(second.to_string(), "Processing for 12s...");
        assert!(matches!(second, ElapsedLabel::Running { long_running: true, .. }));
    }

    #[test]
    fn test_repeated_running_polls_keep_start() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::SOLUTION);
        let running = Job::new(JobKind::SOLUTION, JobStatus::Processing);

        tracker.on_transition(&key, Some(JobStatus::Pending), &running, t0());
        tracker.on_transition(
            &key,
            Some(JobStatus::Processing),
            &running,
            t0() + Duration::seconds(2),
        );
        assert_eq!(tracker.started_at(&key), Some(t0()));
    }

    #[test]
    fn test_completed_without_start_uses_server_duration() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::SOLUTION);
        let done = Job::new(JobKind::SOLUTION, JobStatus::Completed).with_processing_time(Some(12.34));

        tracker.on_transition(&key, None, &done, t0());
        let label = tracker.elapsed_label(&key, &done, t0()).unwrap();
        assert_eq!(label.to_string(), "Processed in 12.3s");
    }

    #[test]
    fn test_completed_without_any_timing_uses_kind_default() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::ASSIGNMENT);
        let done = Job::new(JobKind::ASSIGNMENT, JobStatus::Completed);

        let label = tracker.elapsed_label(&key, &done, t0()).unwrap();
        assert_eq!(label.to_string(), "Processed in 45.2s");
    }

    #[test]
    fn test_pending_has_no_label() {
        let mut tracker = tracker();
        let key = JobKey::new("a1", JobKind::RUBRIC);
        let pending = Job::new(JobKind::RUBRIC, JobStatus::Pending);
        assert!(tracker.elapsed_label(&key, &pending, t0()).is_none());

        let na = Job::new(JobKind::RUBRIC, JobStatus::NotApplicable);
        assert!(tracker.elapsed_label(&key, &na, t0()).is_none());
    }

    #[test]
    fn test_restart_discards_frozen_duration() {
        let mut tracker = tracker();
        let key = JobKey::new("s1", JobKind::Evaluation);
        let done = Job::new(JobKind::Evaluation, JobStatus::Completed);
        tracker.on_transition(&key, None, &done, t0());

        let restart_at = t0() + Duration::seconds(60);
        tracker.restart(&key, restart_at);

        let running = Job::new(JobKind::Evaluation, JobStatus::Evaluating);
        let label = tracker
            .elapsed_label(&key, &running, restart_at + Duration::seconds(7))
            .unwrap();
        assert_eq!(label.to_string(), "Processing for 7s...");

        tracker.on_transition(
            &key,
            Some(JobStatus::Evaluating),
            &done,
            restart_at + Duration::seconds(8),
        );
        let label = tracker
            .elapsed_label(&key, &done, restart_at + Duration::seconds(30))
            .unwrap();
        assert_eq!(label.to_string(), "Processed in 8.0s");
    }

    #[test]
    fn test_forget_entity() {
        let mut tracker = tracker();
        let running = Job::new(JobKind::Evaluation, JobStatus::Evaluating);
        let a = JobKey::new("s1", JobKind::Evaluation);
        let b = JobKey::new("s2", JobKind::Evaluation);
        tracker.on_transition(&a, None, &running, t0());
        tracker.on_transition(&b, None, &running, t0());

        tracker.forget("s1");
        assert!(tracker.started_at(&a).is_none());
        assert_eq!(tracker.started_at(&b), Some(t0()));
    }
}
