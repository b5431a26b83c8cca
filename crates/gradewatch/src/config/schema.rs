use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::status::{DocumentKind, JobKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub version: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub default_durations: DefaultDurations,
}

impl TrackerConfig {
    /// Builds a config pointing at `base_url` with every other setting defaulted.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            version: "1.0".to_string(),
            source: SourceConfig {
                base_url: base_url.to_string(),
                bearer_token: None,
                request_timeout_ms: default_request_timeout_ms(),
            },
            polling: PollingConfig::default(),
            display: DisplayConfig::default(),
            default_durations: DefaultDurations::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval for per-entity detail polling (processing page, results page).
    #[serde(default = "default_detail_interval_ms")]
    pub detail_interval_ms: u64,
    /// Interval for the coarse list refresh.
    #[serde(default = "default_list_interval_ms")]
    pub list_interval_ms: u64,
}

/// Smallest poll interval handed to the timer.
const MIN_INTERVAL_MS: u64 = 1;

fn default_detail_interval_ms() -> u64 {
    2_000
}

fn default_list_interval_ms() -> u64 {
    30_000
}

impl PollingConfig {
    /// Never zero; a config built in code skips the loader's checks.
    pub fn detail_interval(&self) -> Duration {
        Duration::from_millis(self.detail_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn list_interval(&self) -> Duration {
        Duration::from_millis(self.list_interval_ms.max(MIN_INTERVAL_MS))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            detail_interval_ms: default_detail_interval_ms(),
            list_interval_ms: default_list_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_highlight_grace_ms")]
    pub highlight_grace_ms: u64,
    #[serde(default = "default_long_running_threshold_secs")]
    pub long_running_threshold_secs: u64,
}

fn default_highlight_grace_ms() -> u64 {
    2_000
}

fn default_long_running_threshold_secs() -> u64 {
    10
}

impl DisplayConfig {
    pub fn highlight_grace(&self) -> Duration {
        Duration::from_millis(self.highlight_grace_ms)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            highlight_grace_ms: default_highlight_grace_ms(),
            long_running_threshold_secs: default_long_running_threshold_secs(),
        }
    }
}

/// Fallback durations (seconds) used for a completed job when neither a
/// recorded start nor a server-supplied duration is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultDurations {
    #[serde(default = "default_assignment_secs")]
    pub assignment: f64,
    #[serde(default = "default_rubric_secs")]
    pub rubric: f64,
    #[serde(default = "default_solution_secs")]
    pub solution: f64,
    #[serde(default = "default_orchestration_secs")]
    pub orchestration: f64,
    #[serde(default = "default_evaluation_secs")]
    pub evaluation: f64,
}

fn default_assignment_secs() -> f64 {
    45.2
}

fn default_rubric_secs() -> f64 {
    25.7
}

fn default_solution_secs() -> f64 {
    30.4
}

fn default_orchestration_secs() -> f64 {
    60.0
}

fn default_evaluation_secs() -> f64 {
    30.0
}

impl DefaultDurations {
    pub fn for_kind(&self, kind: JobKind) -> f64 {
        match kind {
            JobKind::Document(DocumentKind::Assignment) => self.assignment,
            JobKind::Document(DocumentKind::Rubric) => self.rubric,
            JobKind::Document(DocumentKind::Solution) => self.solution,
            JobKind::Orchestration => self.orchestration,
            JobKind::Evaluation => self.evaluation,
        }
    }
}

impl Default for DefaultDurations {
    fn default() -> Self {
        Self {
            assignment: default_assignment_secs(),
            rubric: default_rubric_secs(),
            solution: default_solution_secs(),
            orchestration: default_orchestration_secs(),
            evaluation: default_evaluation_secs(),
        }
    }
}
