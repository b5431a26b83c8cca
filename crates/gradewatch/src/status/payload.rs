//! Raw status payloads as returned by the status source.
//!
//! Every field is optional and deserialized leniently: a value of the wrong
//! JSON type is treated as absent instead of failing the whole payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::job::OrchestrationSummary;

/// Per-id status payload of an evaluated entity (a submission).
///
/// `primary_status` is the finer-grained evaluation field and
/// `secondary_status` the coarser processing field. The server's own field
/// names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatusPayload {
    #[serde(alias = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(alias = "evaluationStatus", deserialize_with = "lenient_string")]
    pub primary_status: Option<String>,
    #[serde(alias = "processingStatus", deserialize_with = "lenient_string")]
    pub secondary_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub orchestration_status: Option<String>,
    #[serde(deserialize_with = "lenient_orchestration")]
    pub orchestration_data: Option<OrchestrationSummary>,
    #[serde(deserialize_with = "lenient_f64")]
    pub processing_time_seconds: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub evaluation_error: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub processing_error: Option<String>,
    /// Generic error text some routes send instead of the two fields above.
    #[serde(deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub overall_grade: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_possible: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub student_name: Option<String>,
}

impl RawStatusPayload {
    /// The most specific error message present. A rerun clears only the
    /// evaluation error, so both fields may be set at once.
    pub fn error_message(&self) -> Option<&str> {
        self.evaluation_error
            .as_deref()
            .or(self.processing_error.as_deref())
            .or(self.error.as_deref())
    }
}

/// Status payload of an assignment and its document/orchestration jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAssignmentStatus {
    #[serde(alias = "assignmentId", alias = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(
        alias = "assignmentProcessingStatus",
        alias = "processingStatus",
        deserialize_with = "lenient_string"
    )]
    pub assignment_status: Option<String>,
    #[serde(alias = "rubricProcessingStatus", deserialize_with = "lenient_string")]
    pub rubric_status: Option<String>,
    #[serde(alias = "solutionProcessingStatus", deserialize_with = "lenient_string")]
    pub solution_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub orchestration_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub processing_error: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub rubric_processing_error: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub solution_processing_error: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub orchestration_error: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub evaluation_ready_status: Option<String>,
    #[serde(deserialize_with = "lenient_orchestration")]
    pub orchestration_data: Option<OrchestrationSummary>,
    #[serde(deserialize_with = "lenient_f64")]
    pub assignment_processing_time: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rubric_processing_time: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub solution_processing_time: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub orchestration_processing_time: Option<f64>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_orchestration<'de, D>(deserializer: D) -> Result<Option<OrchestrationSummary>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_field_names_are_accepted() {
        let raw: RawStatusPayload = serde_json::from_str(
            r#"{
                "_id": "sub-1",
                "evaluationStatus": "pending",
                "processingStatus": "completed",
                "overallGrade": 42,
                "totalPossible": "50"
            }"#,
        )
        .unwrap();

        assert_eq!(raw.id.as_deref(), Some("sub-1"));
        assert_eq!(raw.primary_status.as_deref(), Some("pending"));
        assert_eq!(raw.secondary_status.as_deref(), Some("completed"));
        assert_eq!(raw.overall_grade, Some(42.0));
        assert_eq!(raw.total_possible, Some(50.0));
    }

    #[test]
    fn test_wrong_types_become_absent() {
        let raw: RawStatusPayload = serde_json::from_str(
            r#"{
                "primaryStatus": ["completed"],
                "secondaryStatus": null,
                "score": "n/a",
                "orchestrationData": "broken",
                "unexpected": { "nested": true }
            }"#,
        )
        .unwrap();

        assert_eq!(raw, RawStatusPayload::default());
    }

    #[test]
    fn test_both_error_fields_are_kept() {
        let raw: RawStatusPayload = serde_json::from_str(
            r#"{
                "_id": "s1",
                "processingStatus": "completed",
                "evaluationStatus": "failed",
                "processingError": "ocr hiccup",
                "evaluationError": "model timeout"
            }"#,
        )
        .unwrap();

        assert_eq!(raw.processing_error.as_deref(), Some("ocr hiccup"));
        assert_eq!(raw.evaluation_error.as_deref(), Some("model timeout"));
        assert_eq!(raw.error_message(), Some("model timeout"));
    }

    #[test]
    fn test_error_message_falls_back() {
        let raw: RawStatusPayload =
            serde_json::from_str(r#"{"processingError": "", "error": "upload missing"}"#).unwrap();
        assert_eq!(raw.error_message(), Some("upload missing"));

        let raw: RawStatusPayload =
            serde_json::from_str(r#"{"processingError": "ocr hiccup"}"#).unwrap();
        assert_eq!(raw.error_message(), Some("ocr hiccup"));
    }

    #[test]
    fn test_assignment_payload_with_orchestration() {
        let raw: RawAssignmentStatus = serde_json::from_str(
            r#"{
                "assignmentId": "a-1",
                "assignmentProcessingStatus": "completed",
                "rubricProcessingStatus": "processing",
                "orchestrationStatus": "completed",
                "evaluationReadyStatus": "partial",
                "orchestrationData": {
                    "completenessScore": 87,
                    "isValid": true,
                    "issuesCount": 2,
                    "recommendationsCount": 3,
                    "hasWarnings": false
                },
                "assignmentProcessingTime": "45.2"
            }"#,
        )
        .unwrap();

        assert_eq!(raw.id.as_deref(), Some("a-1"));
        assert_eq!(raw.rubric_status.as_deref(), Some("processing"));
        assert_eq!(raw.assignment_processing_time, Some(45.2));
        let data = raw.orchestration_data.unwrap();
        assert_eq!(data.completeness_score, 87);
        assert!(data.is_valid);
        assert_eq!(data.recommendations_count, 3);
    }
}
