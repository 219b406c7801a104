//! Shared types for the API layer.

use std::sync::Arc;

use crate::pipeline::jobs::SummaryJobStore;
use crate::pipeline::DocumentService;

/// Header carrying the caller identity forwarded by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Optional role header forwarded by the auth gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub service: Arc<DocumentService>,
    pub jobs: Arc<SummaryJobStore>,
}

impl ApiContext {
    pub fn new(service: Arc<DocumentService>) -> Self {
        Self {
            service,
            jobs: Arc::new(SummaryJobStore::new()),
        }
    }
}

/// Caller identity, injected into request extensions by the identity
/// middleware. Absent headers leave the fields `None`; each operation
/// decides whether that is acceptable.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    pub user_id: Option<String>,
    pub role: Option<String>,
}
