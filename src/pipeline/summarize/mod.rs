pub mod prompt;
pub mod redact;
pub mod summarizer;

pub use summarizer::*;

use thiserror::Error;

use crate::pipeline::ollama::OllamaError;

#[derive(Error, Debug)]
pub enum SummarizationError {
    #[error("Model call failed: {0}")]
    Model(#[from] OllamaError),

    #[error("No text to summarize")]
    EmptyInput,

    #[error("Model returned an empty summary")]
    EmptySummary,
}
