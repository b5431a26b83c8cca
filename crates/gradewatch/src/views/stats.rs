//! Score statistics over completed submissions.

use std::sync::Arc;

use serde::Serialize;

use crate::status::JobStatus;
use crate::store::{Entity, EntityKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Computes statistics over `scores`. Non-finite values are ignored; an
/// empty input yields a zeroed record.
pub fn stats(scores: &[f64]) -> Stats {
    let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
    if sorted.is_empty() {
        return Stats::default();
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    Stats {
        count: n,
        mean,
        std_dev: variance.sqrt(),
        median,
        min: sorted[0],
        max: sorted[n - 1],
    }
}

/// Statistics over the completed submissions in `entities`. A completed
/// submission without a score counts as 0.
pub fn stats_for(entities: &[Arc<Entity>]) -> Stats {
    let scores: Vec<f64> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Submission && e.status == JobStatus::Completed)
        .map(|e| e.score.unwrap_or(0.0))
        .collect();
    stats(&scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_sample() {
        let s = stats(&[90.0, 70.0, 100.0, 80.0]);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 85.0);
        assert!((s.std_dev - 125f64.sqrt()).abs() < 1e-9);
        assert_eq!(s.median, 85.0);
        assert_eq!(s.min, 70.0);
        assert_eq!(s.max, 100.0);
    }

    #[test]
    fn test_odd_sample_median() {
        let s = stats(&[3.0, 1.0, 2.0]);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.std_dev, (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_empty_is_zeroed() {
        assert_eq!(stats(&[]), Stats::default());
        assert_eq!(stats(&[f64::NAN, f64::INFINITY]), Stats::default());
    }

    #[test]
    fn test_single_value() {
        let s = stats(&[42.0]);
        assert_eq!(s.mean, 42.0);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.median, 42.0);
    }

    #[test]
    fn test_only_completed_submissions_count() {
        let mut graded = Entity::submission("s1", JobStatus::Completed);
        graded.score = Some(80.0);
        let unscored = Entity::submission("s2", JobStatus::Completed);
        let mut running = Entity::submission("s3", JobStatus::Evaluating);
        running.score = Some(10.0);
        let mut failed = Entity::submission("s4", JobStatus::Failed);
        failed.score = Some(5.0);

        let entities: Vec<Arc<Entity>> = [graded, unscored, running, failed]
            .into_iter()
            .map(Arc::new)
            .collect();
        let s = stats_for(&entities);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 40.0);
        assert_eq!(s.min, 0.0);
    }
}
