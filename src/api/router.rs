//! Document API router.
//!
//! Middleware stack (outermost → innermost):
//! 1. Cache-Control: no-store → 2. Identity → 3. Audit logger → handler

use axum::extract::DefaultBodyLimit;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Room for multipart boundaries and the text parts around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the document API router.
///
/// The body limit sits above the configured upload ceiling so an
/// oversized file still reaches validation and gets a 400 with a message
/// instead of a bare 413.
pub fn build_router(ctx: ApiContext) -> Router {
    let body_limit = ctx
        .service
        .config()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/documents", post(endpoints::documents::upload))
        .route("/documents/:id", get(endpoints::documents::download))
        .route("/documents/:id/summary", get(endpoints::documents::summary))
        .route("/documents/:id/summary/jobs", post(endpoints::jobs::start))
        .route("/documents/case/:case_id", get(endpoints::documents::list_by_case))
        .route("/summary-jobs/:job_id", get(endpoints::jobs::status))
        .with_state(ctx)
        // Innermost first, outermost last
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::identity::resolve_caller))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
