use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::job::{Fingerprint, JobStatus};
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Each domain failure has its own code so the dashboard can render a specific message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duplicate posting: {0}")]
    DuplicatePosting(Fingerprint),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    #[error("Fabrication detected: {0}")]
    FabricationDetected(String),

    #[error("Draft not presentable: {0}")]
    DraftNotPresentable(String),

    #[error("External capability timed out: {0}")]
    ExternalTimeout(String),

    #[error("External capability error: {message}")]
    External { message: String, retryable: bool },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ExternalTimeout(_) | AppError::MalformedGenerationOutput(_) => true,
            AppError::External { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::DuplicatePosting(fp) => (
                StatusCode::CONFLICT,
                "DUPLICATE_POSTING",
                format!("A job with fingerprint {fp} already exists"),
            ),
            AppError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                format!("Cannot move a job from '{from}' to '{to}'"),
            ),
            AppError::MalformedGenerationOutput(msg) => {
                tracing::warn!("Malformed generation output: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_GENERATION_OUTPUT",
                    "The model returned output that did not match the expected schema".to_string(),
                )
            }
            AppError::FabricationDetected(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "FABRICATION_DETECTED",
                msg.clone(),
            ),
            AppError::DraftNotPresentable(msg) => (
                StatusCode::CONFLICT,
                "DRAFT_NOT_PRESENTABLE",
                msg.clone(),
            ),
            AppError::ExternalTimeout(msg) => {
                tracing::warn!("External capability timeout: {msg}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "EXTERNAL_TIMEOUT",
                    "An external service did not respond in time".to_string(),
                )
            }
            AppError::External { message, retryable } => {
                tracing::error!("External capability error (retryable={retryable}): {message}");
                let status = if *retryable {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::FAILED_DEPENDENCY
                };
                (
                    status,
                    "EXTERNAL_ERROR",
                    "An external service request failed".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "retryable": retryable
            }
        }));

        (status, body).into_response()
    }
}
