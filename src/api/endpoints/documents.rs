//! Document endpoints: upload, download, summary, list by case.

use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use super::{blocking, parse_document_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::models::DocumentMetadata;
use crate::pipeline::ingress::{UploadRequest, OCTET_STREAM};
use crate::pipeline::summarize_with_timeout;

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// `POST /documents`: multipart upload.
///
/// Parts: `file` (with filename and content type), `caseId`, optional
/// `filesize`. Unknown parts are ignored.
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentMetadata>), ApiError> {
    let mut request = UploadRequest {
        uploader: caller.user_id,
        ..UploadRequest::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                request.filename = field.file_name().map(str::to_string);
                request.declared_mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read file: {e}")))?;
                request.payload = Some(bytes.to_vec());
            }
            Some("caseId") => {
                request.case_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Could not read caseId: {e}")))?,
                );
            }
            Some("filesize") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Could not read filesize: {e}")))?;
                request.declared_size = raw.trim().parse().ok();
            }
            _ => {}
        }
    }

    let service = ctx.service.clone();
    let metadata = blocking(move || service.upload(request)).await?;
    Ok((StatusCode::CREATED, Json(metadata)))
}

/// `GET /documents/:id`: decrypted bytes as an attachment.
pub async fn download(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_document_id(&id)?;
    let service = ctx.service.clone();
    let document = blocking(move || service.download(&id, caller.user_id.as_deref())).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&document.metadata.filetype)
            .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM)),
    );
    headers.insert(CONTENT_DISPOSITION, content_disposition(&document.metadata.filename));

    Ok((headers, document.bytes).into_response())
}

/// `GET /documents/:id/summary`: runs the full pipeline synchronously.
pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let id = parse_document_id(&id)?;
    let summary = summarize_with_timeout(ctx.service.clone(), id, caller.user_id).await?;
    Ok(Json(SummaryResponse {
        summary: summary.text,
    }))
}

/// `GET /documents/case/:case_id`: metadata of every document in a case.
pub async fn list_by_case(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(case_id): Path<String>,
) -> Result<Json<Vec<DocumentMetadata>>, ApiError> {
    let service = ctx.service.clone();
    let documents =
        blocking(move || service.list_by_case(&case_id, caller.user_id.as_deref())).await?;
    Ok(Json(documents))
}

/// `attachment; filename="<name>"`, quotes and backslashes escaped.
/// Names that are not valid header text fall back to ASCII with `_`.
fn content_disposition(filename: &str) -> HeaderValue {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\"")).unwrap_or_else(|_| {
        let ascii: String = escaped
            .chars()
            .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
            .collect();
        HeaderValue::from_str(&format!("attachment; filename=\"{ascii}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
    })
}
