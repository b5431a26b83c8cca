use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch status for '{id}': {message}")]
    Fetch { id: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from status source: {0}")]
    InvalidResponse(String),

    #[error("Failed to load collection for '{parent}': {message}")]
    CollectionLoad { parent: String, message: String },

    #[error("Action '{action}' rejected for '{id}': {message}")]
    ActionRejected {
        id: String,
        action: String,
        message: String,
    },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

impl TrackerError {
    /// Returns true if the error is likely transient and the next poll may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Fetch { .. } => true,
            TrackerError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_retryable() {
        let err = TrackerError::Fetch {
            id: "sub-1".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("sub-1"));
    }

    #[test]
    fn test_action_rejected_is_not_retryable() {
        let err = TrackerError::ActionRejected {
            id: "sub-1".to_string(),
            action: "rerun".to_string(),
            message: "quota exceeded".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_config_error_converts() {
        let err: TrackerError = ConfigError::Validation {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, TrackerError::Config(_)));
    }
}
