//! Error types for Kubejudge.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.
//! Verification failures are not errors: a failed check is captured in the
//! entry's report, and every entry always receives a verdict. The variants
//! here cover faults of the engine itself and of its collaborators.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Unified error type for Kubejudge operations.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External tool invocation failed: {0}")]
    ToolInvocation(String),

    #[error("External call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Model output failed validation: {0}")]
    MalformedModelOutput(String),

    #[error("Completion service rate-limited; retries exhausted after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for JudgeError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            JudgeError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            JudgeError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Configuration error".to_string(),
                Some(msg.clone()),
            ),
            JudgeError::Io(e) => {
                tracing::error!(error = %e, "I/O error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "An I/O error occurred".to_string(),
                    None,
                )
            }
            JudgeError::Serialization(e) => (
                StatusCode::BAD_REQUEST,
                "SERIALIZATION_ERROR",
                "Failed to process request/response".to_string(),
                Some(e.to_string()),
            ),
            JudgeError::ToolInvocation(msg) => (
                StatusCode::BAD_GATEWAY,
                "TOOL_INVOCATION_FAILED",
                "An external checker could not be invoked".to_string(),
                Some(msg.clone()),
            ),
            JudgeError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                format!("External call timed out after {secs}s"),
                None,
            ),
            JudgeError::MalformedModelOutput(msg) => (
                StatusCode::BAD_GATEWAY,
                "MALFORMED_MODEL_OUTPUT",
                "The completion service returned an unparseable payload".to_string(),
                Some(msg.clone()),
            ),
            JudgeError::RateLimited { attempts } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "RATE_LIMITED",
                format!("Rate-limited; gave up after {attempts} attempts"),
                None,
            ),
            JudgeError::Completion(msg) => (
                StatusCode::BAD_GATEWAY,
                "COMPLETION_ERROR",
                "The completion service call failed".to_string(),
                Some(msg.clone()),
            ),
            JudgeError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for Kubejudge operations.
pub type JudgeResult<T> = Result<T, JudgeError>;
