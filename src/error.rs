//! Domain-specific error types for lca-insight

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the orchestration layer
#[derive(Error, Debug)]
pub enum LcaError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Upstream service error: {message}")]
    TransientService { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

impl LcaError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        LcaError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        LcaError::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        LcaError::Configuration {
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (400-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(self, LcaError::InvalidRequest { .. })
    }
}

impl From<toml::de::Error> for LcaError {
    fn from(err: toml::de::Error) -> Self {
        LcaError::Configuration {
            message: format!("Invalid config file: {}", err),
        }
    }
}

/// Convert LcaError to an HTTP response for the boundary layer
impl IntoResponse for LcaError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let details = self.to_string();
        let body = json!({
            "success": false,
            "error": details,
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, LcaError>;
