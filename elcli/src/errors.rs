//! Error types for the edge leap cli

use http::StatusCode;
use thiserror::Error;

/// Main error type for the edge leap cli
#[derive(Error, Debug)]
pub enum LeapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("Unauthorized: invalid or missing token ({operation})")]
    Unauthorized { operation: String },

    #[error("Unexpected hub behaviour on {operation}: status {status}{}", fmt_error_code(.error_code))]
    UnexpectedStatus {
        operation: String,
        status: StatusCode,
        error_code: Option<String>,
    },

    #[error("Precondition check failed for configuration '{id}': {source}")]
    PreconditionFailed {
        id: String,
        #[source]
        source: Box<LeapError>,
    },

    #[error("Could not remove existing configuration '{id}': {source}")]
    RemovalFailed {
        id: String,
        #[source]
        source: Box<LeapError>,
    },

    #[error("Could not create configuration '{id}': {source}")]
    CreationFailed {
        id: String,
        #[source]
        source: Box<LeapError>,
    },

    #[error("Device twin update failed for '{device_id}': {source}")]
    TwinUpdateFailed {
        device_id: String,
        #[source]
        source: Box<LeapError>,
    },

    #[error("Invalid configuration content: {0}")]
    ContentError(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_error_code(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl LeapError {
    /// Status code observed from the hub, if this error carries one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            LeapError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            LeapError::UnexpectedStatus { status, .. } => Some(*status),
            LeapError::PreconditionFailed { source, .. }
            | LeapError::RemovalFailed { source, .. }
            | LeapError::CreationFailed { source, .. }
            | LeapError::TwinUpdateFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True for credential problems, anywhere in the chain
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<anyhow::Error> for LeapError {
    fn from(err: anyhow::Error) -> Self {
        LeapError::Internal(err.to_string())
    }
}
