use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::prompt::{build_summary_prompt, SUMMARY_SYSTEM_PROMPT};
use super::redact::{collect_identifiers, sanitize_llm_output, scrub_identifiers};
use super::SummarizationError;
use crate::models::enums::SummaryType;
use crate::pipeline::ollama::{LlmClient, OllamaError};

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub summary_type: SummaryType,
}

/// Condenses extracted document text into a de-identified summary.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, document_text: &str) -> Result<Summary, SummarizationError>;
}

/// Summarizer backed by a third-party text generation model.
pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize(&self, document_text: &str) -> Result<Summary, SummarizationError> {
        if document_text.trim().is_empty() {
            return Err(SummarizationError::EmptyInput);
        }

        let start = Instant::now();
        let (prompt, truncated) = build_summary_prompt(document_text);
        if truncated {
            warn!(chars = document_text.chars().count(), "Document text truncated for summarization");
        }

        let raw = self.client.generate(&self.model, &prompt, SUMMARY_SYSTEM_PROMPT)?;
        let cleaned = sanitize_llm_output(&raw);
        let identifiers = collect_identifiers(document_text);
        let text = scrub_identifiers(&cleaned, &identifiers);

        if text.trim().is_empty() {
            return Err(SummarizationError::EmptySummary);
        }

        info!(
            model = %self.model,
            identifiers = identifiers.len(),
            summary_chars = text.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Summary generated"
        );
        Ok(Summary {
            text,
            summary_type: SummaryType::ThirdParty,
        })
    }
}

// ── Mock for testing ──────────────────────────────────────

enum MockBehavior {
    Fixed(String),
    EchoDocument,
    Unreachable,
}

/// LLM client for tests: a fixed reply, an echo of the `<document>` block,
/// or a connection failure. Counts calls.
pub struct MockLlmClient {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with(MockBehavior::Fixed(response.to_string()))
    }

    /// Reply with the document text from the prompt, names included.
    pub fn echoing() -> Self {
        Self::with(MockBehavior::EchoDocument)
    }

    pub fn unreachable() -> Self {
        Self::with(MockBehavior::Unreachable)
    }

    fn with(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, prompt: &str, _system: &str) -> Result<String, OllamaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Fixed(response) => Ok(response.clone()),
            MockBehavior::EchoDocument => {
                let body = prompt
                    .split_once("<document>")
                    .and_then(|(_, rest)| rest.split_once("</document>"))
                    .map(|(doc, _)| doc.trim())
                    .unwrap_or(prompt);
                Ok(format!("Summary: {body}"))
            }
            MockBehavior::Unreachable => {
                Err(OllamaError::Connection("http://localhost:11434".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Patient: Maria Lopez\nPhysician: Dr. Alan Whitfield\nHbA1c 6.9%";

    #[test]
    fn returns_thirdparty_summary() {
        let summarizer = LlmSummarizer::new(Arc::new(MockLlmClient::new("HbA1c is 6.9%.")), "medgemma:4b");
        let summary = summarizer.summarize(DOC).unwrap();
        assert_eq!(summary.text, "HbA1c is 6.9%.");
        assert_eq!(summary.summary_type, SummaryType::ThirdParty);
    }

    #[test]
    fn names_leaked_by_model_are_scrubbed() {
        let summarizer = LlmSummarizer::new(Arc::new(MockLlmClient::echoing()), "m");
        let summary = summarizer.summarize(DOC).unwrap();
        assert!(summary.text.contains("HbA1c 6.9%"));
        assert!(!summary.text.contains("Maria"));
        assert!(!summary.text.contains("Lopez"));
        assert!(!summary.text.contains("Whitfield"));
    }

    #[test]
    fn empty_model_output_is_error() {
        let summarizer = LlmSummarizer::new(Arc::new(MockLlmClient::new("<think>hmm</think>  ")), "m");
        assert!(matches!(
            summarizer.summarize(DOC),
            Err(SummarizationError::EmptySummary)
        ));
    }

    #[test]
    fn model_failure_propagates() {
        let summarizer = LlmSummarizer::new(Arc::new(MockLlmClient::unreachable()), "m");
        assert!(matches!(
            summarizer.summarize(DOC),
            Err(SummarizationError::Model(OllamaError::Connection(_)))
        ));
    }

    #[test]
    fn blank_input_never_reaches_model() {
        let client = Arc::new(MockLlmClient::new("x"));
        let summarizer = LlmSummarizer::new(client.clone(), "m");
        assert!(matches!(summarizer.summarize(" \n "), Err(SummarizationError::EmptyInput)));
        assert_eq!(client.call_count(), 0);
    }
}
