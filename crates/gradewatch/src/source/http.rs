//! HTTP status source speaking the grading server's JSON routes.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{ActionOutcome, ActionParams, Collection, RawStatus, StatusSource};
use crate::config::SourceConfig;
use crate::error::{ConfigError, Result, TrackerError};
use crate::status::{
    normalize_assignment, normalize_submission, RawAssignmentStatus, RawStatusPayload,
};
use crate::store::{Entity, EntityKind};

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum length of a response body quoted in an error.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

/// [`StatusSource`] backed by the grading server's REST API.
pub struct HttpStatusSource {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpStatusSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::Validation {
            message: format!("Invalid source.base_url '{}': {}", config.base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Validation {
                message: format!("source.base_url '{}' cannot hold a path", config.base_url),
            }
            .into());
        }

        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Builds `{base_url}/api/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json(&self, what: &str, url: Url) -> Result<Value> {
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(url)).send().await?;
        Self::read_json(what, response).await
    }

    async fn read_json(what: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{}: {}", status, truncate_body(&body));
            return Err(if status.is_server_error() {
                TrackerError::Fetch {
                    id: what.to_string(),
                    message,
                }
            } else {
                TrackerError::InvalidResponse(format!("{} ({})", message, what))
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_list(&self, collection: &Collection) -> Result<Vec<Entity>> {
        match collection {
            Collection::Submissions { assignment_id } => {
                let url = self.endpoint(&["submissions", assignment_id.as_str()]);
                let body = self.get_json(assignment_id, url).await?;
                parse_list(body, &["submissions", "data"], EntityKind::Submission)
            }
            Collection::Assignments => {
                let body = self
                    .get_json("assignments", self.endpoint(&["assignments"]))
                    .await?;
                parse_list(body, &["assignments", "data"], EntityKind::Assignment)
            }
            Collection::Assignment { id } => {
                let raw = self.fetch_one(EntityKind::Assignment, id).await?;
                Ok(vec![raw.into_entity(id)])
            }
        }
    }

    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<RawStatus> {
        match kind {
            EntityKind::Submission => {
                let url = self.endpoint(&["submissions", "single", id]);
                let body = self.get_json(id, url).await?;
                Ok(RawStatus::Submission(parse_object(body, &["submission", "data"])?))
            }
            EntityKind::Assignment => {
                let url = self.endpoint(&["assignments", id, "status"]);
                let body = self.get_json(id, url).await?;
                Ok(RawStatus::Assignment(parse_object(
                    body,
                    &["status", "assignment", "data"],
                )?))
            }
        }
    }

    async fn trigger_action(&self, id: &str, action: ActionParams) -> Result<ActionOutcome> {
        let request = match action {
            ActionParams::RerunEvaluation => {
                self.client.post(self.endpoint(&["submissions", id, "rerun"]))
            }
            ActionParams::RerunOrchestration { force_reread } => self
                .client
                .post(self.endpoint(&["assignments", id, "rerun-orchestration"]))
                .json(&json!({ "forceReread": force_reread })),
        };

        debug!("Triggering {} for {}", action.name(), id);
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::ActionRejected {
                id: id.to_string(),
                action: action.name().to_string(),
                message: format!("{}: {}", status, truncate_body(&body)),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Ok(parse_outcome(&body))
    }
}

/// Returns the value under the first of `keys` present as an object or
/// array, or `value` itself for a bare body.
fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    if let Value::Object(map) = &value {
        for key in keys {
            if let Some(inner @ (Value::Object(_) | Value::Array(_))) = map.get(*key) {
                return inner.clone();
            }
        }
    }
    value
}

fn parse_object<T: DeserializeOwned>(body: Value, keys: &[&str]) -> Result<T> {
    match unwrap_envelope(body, keys) {
        value @ Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| TrackerError::InvalidResponse(format!("Malformed status payload: {}", e))),
        other => Err(TrackerError::InvalidResponse(format!(
            "Expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn parse_list(body: Value, keys: &[&str], kind: EntityKind) -> Result<Vec<Entity>> {
    let items = match unwrap_envelope(body, keys) {
        Value::Array(items) => items,
        other => {
            return Err(TrackerError::InvalidResponse(format!(
                "Expected a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut entities = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let label = item_label(&item, index);
        let parsed = match kind {
            EntityKind::Submission => serde_json::from_value::<RawStatusPayload>(item)
                .map(|raw| raw.id.clone().map(|id| normalize_submission(&id, &raw))),
            EntityKind::Assignment => serde_json::from_value::<RawAssignmentStatus>(item)
                .map(|raw| raw.id.clone().map(|id| normalize_assignment(&id, &raw))),
        };
        match parsed {
            Ok(Some(entity)) => entities.push(entity),
            Ok(None) => warn!("Skipping {} without a usable id", label),
            Err(e) => warn!("Skipping malformed {}: {}", label, e),
        }
    }
    Ok(entities)
}

/// Names a list item in logs by its id when it has one.
fn item_label(item: &Value, index: usize) -> String {
    let id = ["_id", "id", "assignmentId"]
        .iter()
        .find_map(|key| match item.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
    match id {
        Some(id) => format!("list item {} ('{}')", index, id),
        None => format!("list item {}", index),
    }
}

/// Parses an action response. An empty or non-JSON 2xx body counts as
/// success.
fn parse_outcome(body: &str) -> ActionOutcome {
    if body.trim().is_empty() {
        return ActionOutcome {
            success: true,
            message: None,
        };
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) if value.get("success").is_some() => {
            serde_json::from_value(value).unwrap_or(ActionOutcome {
                success: true,
                message: None,
            })
        }
        _ => ActionOutcome {
            success: true,
            message: None,
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
