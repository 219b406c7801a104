use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::SummaryType;

/// Stored document. `file_data` is always ciphertext.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub filesize: i64,
    pub filetype: String,
    pub file_data: Vec<u8>,
    pub encryption_iv: String,
    pub case_id: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub summary_type: Option<SummaryType>,
    pub last_summarized: Option<DateTime<Utc>>,
    /// SHA-256 of the plaintext the cached summary was computed from.
    pub summary_source_hash: Option<String>,
}

/// Client-facing view of a document: everything except ciphertext and IV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub id: Uuid,
    pub filename: String,
    pub filesize: i64,
    pub filetype: String,
    pub case_id: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
    pub summary_type: Option<SummaryType>,
    pub last_summarized: Option<DateTime<Utc>>,
}

impl Document {
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            id: self.id,
            filename: self.filename.clone(),
            filesize: self.filesize,
            filetype: self.filetype.clone(),
            case_id: self.case_id.clone(),
            uploaded_by: self.uploaded_by.clone(),
            created_at: self.created_at,
            uploaded_at: self.uploaded_at,
            summary_type: self.summary_type,
            last_summarized: self.last_summarized,
        }
    }
}
