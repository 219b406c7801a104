use std::path::{Path, PathBuf};

use super::ExtractionError;

/// One rendered page on disk, inside the request's scratch directory.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// Zero-based page index in the source document.
    pub index: usize,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// One-based page number.
    pub page_number: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
    /// Page texts in page order, separated by a blank line.
    pub full_text: String,
}

/// Renders every page of a PDF file to an image file in `out_dir`.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<RasterPage>, ExtractionError>;
}

/// Recognizes text in a single page image.
///
/// `page` is only used for error reporting.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page: usize, image_bytes: &[u8]) -> Result<String, ExtractionError>;
}
