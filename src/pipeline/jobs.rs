//! Asynchronous summary jobs.
//!
//! A job runs the same pipeline as the synchronous summary endpoint and
//! keeps its outcome in memory for polling. Finished jobs are dropped
//! after `JOB_RETENTION_SECS`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::processor::{summarize_with_timeout, DocumentService};

pub const JOB_RETENTION_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryJob {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Caller that started the job. Never serialized.
    #[serde(skip)]
    pub requested_by: Option<String>,
}

#[derive(Default)]
pub struct SummaryJobStore {
    jobs: Mutex<HashMap<Uuid, SummaryJob>>,
}

impl SummaryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, document_id: Uuid, requested_by: Option<String>) -> SummaryJob {
        let job = SummaryJob {
            job_id: Uuid::new_v4(),
            document_id,
            status: JobStatus::Pending,
            summary: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
            requested_by,
        };
        let mut jobs = self.lock();
        prune_finished(&mut jobs, Utc::now());
        jobs.insert(job.job_id, job.clone());
        job
    }

    /// Look up a job. Expired finished jobs are pruned first, so an idle
    /// store does not hold summaries past the retention window.
    pub fn get(&self, job_id: &Uuid) -> Option<SummaryJob> {
        let mut jobs = self.lock();
        prune_finished(&mut jobs, Utc::now());
        jobs.get(job_id).cloned()
    }

    pub fn mark_running(&self, job_id: &Uuid) {
        self.update(job_id, |job| job.status = JobStatus::Running);
    }

    pub fn complete(&self, job_id: &Uuid, summary: String) {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.summary = Some(summary);
            job.finished_at = Some(Utc::now());
        });
    }

    pub fn fail(&self, job_id: &Uuid, error: String) {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.finished_at = Some(Utc::now());
        });
    }

    fn update(&self, job_id: &Uuid, apply: impl FnOnce(&mut SummaryJob)) {
        if let Some(job) = self.lock().get_mut(job_id) {
            apply(job);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SummaryJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune_finished(jobs: &mut HashMap<Uuid, SummaryJob>, now: DateTime<Utc>) {
    jobs.retain(|_, job| match job.finished_at {
        Some(finished) if job.status.is_finished() => {
            (now - finished).num_seconds() < JOB_RETENTION_SECS
        }
        _ => true,
    });
}

/// Register a job and run the summary pipeline for it in the background.
///
/// Access is checked by the pipeline itself; callers that want early
/// 403/404 answers call `DocumentService::authorize_document` first.
/// Readers of the finished job must pass the same check again.
pub fn spawn_summary_job(
    service: Arc<DocumentService>,
    store: Arc<SummaryJobStore>,
    document_id: Uuid,
    caller: Option<String>,
) -> SummaryJob {
    let job = store.create(document_id, caller.clone());
    let job_id = job.job_id;

    tokio::spawn(async move {
        store.mark_running(&job_id);
        match summarize_with_timeout(service, document_id, caller).await {
            Ok(summary) => {
                info!(%job_id, %document_id, "Summary job completed");
                store.complete(&job_id, summary.text);
            }
            Err(e) => {
                warn!(%job_id, %document_id, error = %e, "Summary job failed");
                store.fail(&job_id, e.to_string());
            }
        }
    });

    job
}
