use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Every per-document failure in the pipeline is one of these variants.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported: {0}")]
    UnsupportedFormat(String),

    #[error("Could not read '{file}': {reason}")]
    DocumentUnreadable { file: String, reason: String },

    #[error("Inference endpoint not reachable at {endpoint}. Start it or set OLLAMA_HOST. Details: {cause}")]
    ServiceUnavailable { endpoint: String, cause: String },

    #[error("Model call failed: {0}")]
    ModelCallFailed(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unreachable { endpoint, cause } => {
                AppError::ServiceUnavailable { endpoint, cause }
            }
            other => AppError::ModelCallFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            AppError::DocumentUnreadable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "DOCUMENT_UNREADABLE")
            }
            AppError::ServiceUnavailable { .. } => {
                tracing::error!("{self}");
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AppError::ModelCallFailed(msg) => {
                tracing::error!("Model call failed: {msg}");
                (StatusCode::BAD_GATEWAY, "MODEL_CALL_FAILED")
            }
            AppError::SchemaViolation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_VIOLATION")
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
