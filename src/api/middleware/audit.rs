//! Audit logging middleware.
//!
//! Logs every request with caller, method, path, status and latency.
//! Runs innermost (after identity has injected `CallerContext`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::CallerContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let (caller, role) = req
        .extensions()
        .get::<CallerContext>()
        .map(|c| (c.user_id.clone(), c.role.clone()))
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        target: "casevault::audit",
        caller = caller.as_deref().unwrap_or("-"),
        role = role.as_deref().unwrap_or("-"),
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = %start.elapsed().as_millis(),
        "API access"
    );
    response
}
