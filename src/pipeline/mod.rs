//! Secure document pipeline.
//!
//! Upload: ingress validation → encryption → persistence.
//! Read: fetch → decryption → (bytes | rasterize → OCR → summarize).

pub mod extraction;
pub mod ingress;
pub mod jobs;
pub mod ollama;
pub mod processor;
pub mod summarize;

pub use processor::*;

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use extraction::ExtractionError;
use summarize::SummarizationError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Caller identity is required")]
    Unauthenticated,

    #[error("User {user_id} is not a participant of case {case_id}")]
    Forbidden { case_id: String, user_id: String },

    #[error("Document not found: {0}")]
    NotFound(Uuid),

    #[error("Encryption failed: {0}")]
    Encryption(CryptoError),

    #[error("Decryption failed: {0}")]
    Decryption(CryptoError),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Summarization failed: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("Summary pipeline exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}
