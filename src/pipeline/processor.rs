//! Document service: the single entry point that drives the pipeline.
//!
//! All methods are blocking. Async callers go through
//! `summarize_with_timeout` or wrap calls in `spawn_blocking`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::extraction::pdfium::PdfiumRasterizer;
use super::extraction::vision_ocr::OllamaVisionOcr;
use super::extraction::TextExtractor;
use super::ingress::{validate_upload, UploadRequest};
use super::ollama::OllamaClient;
use super::summarize::{LlmSummarizer, Summarizer, Summary};
use super::PipelineError;
use crate::authorization::check_case_access;
use crate::config::AppConfig;
use crate::db::repository;
use crate::models::enums::SummaryType;
use crate::models::{Document, DocumentMetadata};

/// Plaintext document handed back to the download transport.
#[derive(Debug)]
pub struct DecryptedDocument {
    pub metadata: DocumentMetadata,
    pub bytes: Vec<u8>,
}

pub struct DocumentService {
    config: Arc<AppConfig>,
    conn: Mutex<Connection>,
    extractor: TextExtractor,
    summarizer: Arc<dyn Summarizer>,
}

impl DocumentService {
    pub fn new(
        config: Arc<AppConfig>,
        conn: Connection,
        extractor: TextExtractor,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            conn: Mutex::new(conn),
            extractor,
            summarizer,
        }
    }

    /// Wire the production engines: PDFium rasterizer, Ollama vision OCR
    /// and Ollama summarizer sharing one HTTP client.
    ///
    /// Builds a blocking HTTP client, so it must run outside async tasks.
    pub fn from_config(config: Arc<AppConfig>, conn: Connection) -> Result<Self, PipelineError> {
        let ollama = Arc::new(
            OllamaClient::new(&config.ollama_url, config.http_timeout)
                .map_err(|e| PipelineError::Internal(e.to_string()))?,
        );
        let ocr = Arc::new(OllamaVisionOcr::new(ollama.clone(), config.ocr_model.clone()));
        let extractor = TextExtractor::new(
            Arc::new(PdfiumRasterizer::new()),
            ocr,
            config.render_dpi,
            config.ocr_workers,
        );
        let summarizer = Arc::new(LlmSummarizer::new(ollama, config.summary_model.clone()));
        Ok(Self::new(config, conn, extractor, summarizer))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PipelineError> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::Internal("database lock poisoned".into()))
    }

    /// Validate, encrypt and persist an upload. Nothing is written unless
    /// every earlier step succeeded.
    ///
    /// Identified callers must participate in the target case. Anonymous
    /// uploads, when explicitly allowed, have no identity to check.
    pub fn upload(&self, request: UploadRequest) -> Result<DocumentMetadata, PipelineError> {
        let caller = request.uploader.clone();
        let candidate = validate_upload(
            request,
            self.config.max_upload_bytes,
            self.config.allow_anonymous_uploads,
        )?;
        if let Some(caller) = caller.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            self.authorize(&*self.conn()?, &candidate.case_id, Some(caller))?;
        }

        let encrypted = self
            .config
            .encryption_key
            .encrypt(&candidate.bytes)
            .map_err(PipelineError::Encryption)?;

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            filename: candidate.filename,
            filesize: candidate.filesize,
            filetype: candidate.filetype,
            file_data: encrypted.ciphertext,
            encryption_iv: encrypted.iv_hex,
            case_id: candidate.case_id,
            uploaded_by: candidate.uploaded_by,
            created_at: now,
            uploaded_at: now,
            summary: None,
            summary_type: None,
            last_summarized: None,
            summary_source_hash: None,
        };
        repository::insert_document(&*self.conn()?, &document)?;

        info!(
            document_id = %document.id,
            case_id = %document.case_id,
            filesize = document.filesize,
            filetype = %document.filetype,
            "Document stored"
        );
        Ok(document.metadata())
    }

    /// Fetch and decrypt a document for download.
    pub fn download(&self, id: &Uuid, caller: Option<&str>) -> Result<DecryptedDocument, PipelineError> {
        let document = self.load_authorized(id, caller)?;
        let bytes = self.decrypt(&document)?;
        debug!(document_id = %id, size = bytes.len(), "Document decrypted for download");
        Ok(DecryptedDocument {
            metadata: document.metadata(),
            bytes,
        })
    }

    /// Metadata of every document in a case, ciphertext excluded.
    pub fn list_by_case(
        &self,
        case_id: &str,
        caller: Option<&str>,
    ) -> Result<Vec<DocumentMetadata>, PipelineError> {
        let conn = self.conn()?;
        self.authorize(&conn, case_id, caller)?;
        Ok(repository::list_documents_by_case(&conn, case_id)?)
    }

    /// Check that the document exists and the caller may read it.
    pub fn authorize_document(&self, id: &Uuid, caller: Option<&str>) -> Result<(), PipelineError> {
        let conn = self.conn()?;
        let case_id = repository::get_document_case_id(&conn, id)?.ok_or(PipelineError::NotFound(*id))?;
        self.authorize(&conn, &case_id, caller)
    }

    /// Decrypt → extract → summarize. No partial results: any failing
    /// stage fails the whole call and the record is left untouched.
    pub fn summarize(&self, id: &Uuid, caller: Option<&str>) -> Result<Summary, PipelineError> {
        let start = Instant::now();
        let document = self.load_authorized(id, caller)?;
        let plaintext = self.decrypt(&document)?;

        let source_hash = self.config.cache_summaries.then(|| sha256_hex(&plaintext));
        if let (Some(hash), Some(cached)) = (&source_hash, &document.summary) {
            if document.summary_source_hash.as_ref() == Some(hash) {
                debug!(document_id = %id, "Serving cached summary");
                return Ok(Summary {
                    text: cached.clone(),
                    summary_type: document.summary_type.unwrap_or(SummaryType::ThirdParty),
                });
            }
        }

        let extracted = self.extractor.extract(&plaintext)?;
        let summary = self.summarizer.summarize(&extracted.full_text)?;

        if let Some(hash) = source_hash {
            repository::update_document_summary(
                &*self.conn()?,
                id,
                &summary.text,
                summary.summary_type,
                &hash,
                Utc::now(),
            )?;
        }

        info!(
            document_id = %id,
            pages = extracted.pages.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Document summarized"
        );
        Ok(summary)
    }

    fn load_authorized(&self, id: &Uuid, caller: Option<&str>) -> Result<Document, PipelineError> {
        let conn = self.conn()?;
        let document = repository::get_document(&conn, id)?.ok_or(PipelineError::NotFound(*id))?;
        self.authorize(&conn, &document.case_id, caller)?;
        Ok(document)
    }

    fn decrypt(&self, document: &Document) -> Result<Vec<u8>, PipelineError> {
        self.config
            .encryption_key
            .decrypt(&document.file_data, &document.encryption_iv)
            .map_err(|e| {
                warn!(document_id = %document.id, error = %e, "Stored document failed to decrypt");
                PipelineError::Decryption(e)
            })
    }

    fn authorize(&self, conn: &Connection, case_id: &str, caller: Option<&str>) -> Result<(), PipelineError> {
        if !self.config.enforce_case_access {
            return Ok(());
        }
        let user_id = caller.ok_or(PipelineError::Unauthenticated)?;
        let decision = check_case_access(conn, case_id, user_id)?;
        if decision.allowed {
            debug!(case_id, user_id, reason = ?decision.reason, "Case access granted");
            Ok(())
        } else {
            warn!(case_id, user_id, reason = ?decision.reason, "Case access denied");
            Err(PipelineError::Forbidden {
                case_id: case_id.to_string(),
                user_id: user_id.to_string(),
            })
        }
    }
}

/// Run `DocumentService::summarize` on the blocking pool, bounded by the
/// configured pipeline timeout.
///
/// On timeout the blocking task keeps running to completion in the
/// background; its scratch directory is still removed when it finishes.
pub async fn summarize_with_timeout(
    service: Arc<DocumentService>,
    id: Uuid,
    caller: Option<String>,
) -> Result<Summary, PipelineError> {
    let limit = service.config().pipeline_timeout;
    let task = tokio::task::spawn_blocking(move || service.summarize(&id, caller.as_deref()));

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(PipelineError::Internal(format!(
            "summary task failed: {join_error}"
        ))),
        Err(_) => {
            warn!(document_id = %id, timeout_secs = limit.as_secs(), "Summary pipeline timed out");
            Err(PipelineError::Timeout(limit))
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
