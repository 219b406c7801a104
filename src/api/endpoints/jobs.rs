//! Asynchronous summary job endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use super::{blocking, parse_document_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::pipeline::jobs::{spawn_summary_job, JobStatus, SummaryJob};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// `POST /documents/:id/summary/jobs`: start a background summary.
///
/// Existence and access are checked up front so the caller gets 404/403
/// instead of a job that fails immediately.
pub async fn start(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let id = parse_document_id(&id)?;
    let service = ctx.service.clone();
    let user_id = caller.user_id.clone();
    blocking(move || service.authorize_document(&id, user_id.as_deref())).await?;

    let job = spawn_summary_job(ctx.service.clone(), ctx.jobs.clone(), id, caller.user_id);
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.job_id,
            status: job.status,
        }),
    ))
}

/// `GET /summary-jobs/:job_id`: poll a job.
///
/// The caller must still be allowed to read the document; a participant
/// who lost access since starting the job gets 403.
pub async fn status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(job_id): Path<String>,
) -> Result<Json<SummaryJob>, ApiError> {
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid job id: {job_id}")))?;
    if ctx.service.config().enforce_case_access && caller.user_id.is_none() {
        return Err(ApiError::Unauthorized);
    }
    let job = ctx
        .jobs
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("Summary job {job_id} not found")))?;

    let service = ctx.service.clone();
    let document_id = job.document_id;
    blocking(move || service.authorize_document(&document_id, caller.user_id.as_deref())).await?;
    Ok(Json(job))
}
