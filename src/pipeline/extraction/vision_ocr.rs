//! Vision OCR: page images → text through an Ollama vision model.
//!
//! DeepSeek-OCR takes its `<|grounding|>` instruction in the user turn and
//! no system prompt. Other vision models get a system prompt plus a plain
//! extraction instruction.

use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::{Duration, Instant};

use base64::Engine as _;
use regex::Regex;

use super::types::OcrEngine;
use super::ExtractionError;
use crate::pipeline::ollama::VisionClient;

const DEEPSEEK_OCR_PROMPT: &str = "<|grounding|>Convert the document to markdown.";

const GENERIC_SYSTEM_PROMPT: &str = "\
You are a document text extractor. Extract ALL visible text from the \
provided page image. Preserve reading order, headers, tables and lists. \
Do not summarize, translate or comment.";

const GENERIC_USER_PROMPT: &str = "Extract all visible text from this page image.";

pub struct OllamaVisionOcr {
    client: Arc<dyn VisionClient>,
    model: String,
}

impl OllamaVisionOcr {
    pub fn new(client: Arc<dyn VisionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn is_deepseek_ocr(&self) -> bool {
        // "library/deepseek-ocr:latest" → "deepseek-ocr:latest"
        self.model
            .rsplit('/')
            .next()
            .unwrap_or(&self.model)
            .starts_with("deepseek-ocr")
    }
}

impl OcrEngine for OllamaVisionOcr {
    fn recognize(&self, page: usize, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let images = vec![base64::engine::general_purpose::STANDARD.encode(image_bytes)];

        let (prompt, system) = if self.is_deepseek_ocr() {
            (DEEPSEEK_OCR_PROMPT, None)
        } else {
            (GENERIC_USER_PROMPT, Some(GENERIC_SYSTEM_PROMPT))
        };

        let raw = self
            .client
            .chat_with_images(&self.model, prompt, &images, system)
            .map_err(|e| ExtractionError::OcrProcessing {
                page,
                reason: e.to_string(),
            })?;
        let text = strip_grounding_markup(&raw);

        tracing::debug!(
            page,
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Page recognized"
        );
        Ok(text)
    }
}

/// Remove DeepSeek-OCR grounding annotations, keeping the referenced text.
///
/// `<|ref|>Name<|/ref|><|det|>[[x1, y1, x2, y2]]<|/det|>` → `Name`
fn strip_grounding_markup(raw: &str) -> String {
    static DET_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<\|det\|>.*?<\|/det\|>").expect("valid regex"));
    static TOKEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<\|/?[a-z_]+\|>").expect("valid regex"));

    let without_boxes = DET_RE.replace_all(raw, "");
    TOKEN_RE.replace_all(&without_boxes, "").trim().to_string()
}

// ── Mock for testing ──────────────────────────────────────

type DelayFn = dyn Fn(&str) -> Duration + Send + Sync;

/// OCR engine that "recognizes" an image as its own bytes read as UTF-8.
///
/// An optional delay function lets tests force out-of-order completion;
/// the completion order is recorded.
pub struct EchoOcrEngine {
    delay: Option<Box<DelayFn>>,
    fail_on: Option<String>,
    completed: Mutex<Vec<String>>,
}

impl EchoOcrEngine {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail_on: None,
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Fail any page whose content contains `marker`.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.to_string());
        self
    }

    pub fn completion_order(&self) -> Vec<String> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for EchoOcrEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for EchoOcrEngine {
    fn recognize(&self, page: usize, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(image_bytes).into_owned();
        if let Some(delay) = &self.delay {
            std::thread::sleep(delay(&text));
        }
        if self.fail_on.as_deref().is_some_and(|m| text.contains(m)) {
            return Err(ExtractionError::OcrProcessing {
                page,
                reason: "mock failure".into(),
            });
        }
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.clone());
        Ok(text)
    }
}
