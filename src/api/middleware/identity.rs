//! Caller identity middleware.
//!
//! Authentication happens upstream; the gateway forwards the caller as
//! `X-User-Id` (and optionally `X-User-Role`). This layer only parses
//! those headers into a `CallerContext`.

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{CallerContext, USER_ID_HEADER, USER_ROLE_HEADER};

pub async fn resolve_caller(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let caller = caller_from_headers(req.headers());
    req.extensions_mut().insert(caller);
    next.run(req).await
}

fn caller_from_headers(headers: &HeaderMap) -> CallerContext {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    CallerContext {
        user_id: read(USER_ID_HEADER),
        role: read(USER_ROLE_HEADER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_forwarded_identity() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", HeaderValue::from_static(" patient-1 "));
        headers.insert("X-User-Role", HeaderValue::from_static("patient"));
        let caller = caller_from_headers(&headers);
        assert_eq!(caller.user_id.as_deref(), Some("patient-1"));
        assert_eq!(caller.role.as_deref(), Some("patient"));
    }

    #[test]
    fn blank_identity_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("X-User-Id", HeaderValue::from_static("  "));
        assert!(caller_from_headers(&headers).user_id.is_none());
        assert!(caller_from_headers(&HeaderMap::new()).user_id.is_none());
    }
}
