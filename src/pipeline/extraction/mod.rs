pub mod orchestrator;
pub mod pdfium;
pub mod types;
pub mod vision_ocr;

pub use orchestrator::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("OCR failed on page {page}: {reason}")]
    OcrProcessing { page: usize, reason: String },

    #[error("No text could be recognized in the document")]
    NoTextRecognized,

    #[error("Unsupported format for text extraction: {0}")]
    UnsupportedFormat(String),
}
