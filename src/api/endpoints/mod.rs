//! API endpoint handlers.
//!
//! Pipeline calls block (cipher, PDFium, model HTTP), so handlers move
//! them onto the blocking pool with `blocking`.

pub mod documents;
pub mod health;
pub mod jobs;

use uuid::Uuid;

use crate::api::error::ApiError;
use crate::pipeline::PipelineError;

/// Run a pipeline call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

pub(crate) fn parse_document_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid document id: {raw}")))
}
