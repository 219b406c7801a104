//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Error response body: `{ "error": { "code", "message", "detail"? } }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Caller identity required")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A pipeline stage failed; the underlying error is returned as detail.
    #[error("{message}: {detail}")]
    Processing { message: &'static str, detail: String },
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Caller identity required".to_string(),
                None,
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Processing { message, detail } => {
                tracing::error!(stage = message, detail = %detail, "Document processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROCESSING_FAILED",
                    message.to_string(),
                    Some(detail),
                )
            }
            ApiError::Timeout(detail) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", detail, None),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => ApiError::BadRequest(msg),
            PipelineError::Unauthenticated => ApiError::Unauthorized,
            e @ PipelineError::Forbidden { .. } => ApiError::Forbidden(e.to_string()),
            PipelineError::NotFound(id) => ApiError::NotFound(format!("Document {id} not found")),
            PipelineError::Encryption(e) => ApiError::Processing {
                message: "Error uploading document",
                detail: e.to_string(),
            },
            PipelineError::Decryption(e) => ApiError::Processing {
                message: "Error decrypting document",
                detail: e.to_string(),
            },
            PipelineError::Extraction(e) => ApiError::Processing {
                message: "Error extracting text from document",
                detail: e.to_string(),
            },
            PipelineError::Summarization(e) => ApiError::Processing {
                message: "Error summarizing document",
                detail: e.to_string(),
            },
            e @ PipelineError::Timeout(_) => ApiError::Timeout(e.to_string()),
            PipelineError::Database(e) => ApiError::Internal(e.to_string()),
            PipelineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
