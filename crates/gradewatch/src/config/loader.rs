use std::path::Path;

use crate::config::schema::TrackerConfig;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/tracker-config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrackerConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<TrackerConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: TrackerConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let base_url = config.source.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("source.base_url must be an http(s) URL, got '{}'", base_url),
        });
    }

    if config.polling.detail_interval_ms == 0 || config.polling.list_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "Polling intervals must be greater than zero".to_string(),
        });
    }

    let durations = &config.default_durations;
    for (name, value) in [
        ("assignment", durations.assignment),
        ("rubric", durations.rubric),
        ("solution", durations.solution),
        ("orchestration", durations.orchestration),
        ("evaluation", durations.evaluation),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation {
                message: format!("default_durations.{} must be a non-negative number", name),
            });
        }
    }

    Ok(())
}
