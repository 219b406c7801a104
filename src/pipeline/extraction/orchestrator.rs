//! Decrypted bytes → rasterized pages → recognized text.
//!
//! Each run owns a `casevault-*` scratch directory that is removed when
//! the run ends, whether it succeeded or not.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};

use super::types::{ExtractedText, OcrEngine, PageText, PdfRasterizer, RasterPage};
use super::ExtractionError;
use crate::pipeline::ingress::sniff_mime;

/// Prefix of per-run scratch directories.
pub const SCRATCH_PREFIX: &str = "casevault-";

const PAGE_SEPARATOR: &str = "\n\n";

pub struct TextExtractor {
    rasterizer: Arc<dyn PdfRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    dpi: u32,
    workers: usize,
    scratch_root: PathBuf,
}

impl TextExtractor {
    pub fn new(rasterizer: Arc<dyn PdfRasterizer>, ocr: Arc<dyn OcrEngine>, dpi: u32, workers: usize) -> Self {
        Self {
            rasterizer,
            ocr,
            dpi,
            workers: workers.max(1),
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Extract text from a decrypted document.
    ///
    /// PDFs are rasterized and recognized page by page; single images go
    /// straight to OCR as one page.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let start = Instant::now();
        let pages = match sniff_mime(bytes) {
            Some("application/pdf") => self.extract_pdf(bytes)?,
            Some(mime) if mime.starts_with("image/") => vec![PageText {
                page_number: 1,
                text: self.ocr.recognize(0, bytes)?,
            }],
            other => {
                return Err(ExtractionError::UnsupportedFormat(
                    other.unwrap_or("unknown").to_string(),
                ))
            }
        };

        let full_text = join_pages(&pages);
        if full_text.trim().is_empty() {
            return Err(ExtractionError::NoTextRecognized);
        }

        info!(
            pages = pages.len(),
            chars = full_text.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Text extraction complete"
        );
        Ok(ExtractedText { pages, full_text })
    }

    fn extract_pdf(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)?;
        let pdf_path = scratch.path().join("document.pdf");
        std::fs::write(&pdf_path, pdf_bytes)?;

        let rasters = self.rasterizer.rasterize(&pdf_path, scratch.path(), self.dpi)?;
        if rasters.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        debug!(pages = rasters.len(), dpi = self.dpi, "PDF rasterized");

        recognize_pages(self.ocr.as_ref(), &rasters, self.workers)
        // `scratch` drops here, removing the PDF copy and every page image.
    }
}

/// Recognize pages on up to `workers` threads; results come back in page
/// order regardless of completion order. The first failure aborts the run.
pub fn recognize_pages(
    ocr: &dyn OcrEngine,
    pages: &[RasterPage],
    workers: usize,
) -> Result<Vec<PageText>, ExtractionError> {
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<PageText>> = Mutex::new(Vec::with_capacity(pages.len()));
    let failure: Mutex<Option<ExtractionError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers.clamp(1, pages.len().max(1)) {
            scope.spawn(|| loop {
                let slot = next.fetch_add(1, Ordering::SeqCst);
                let Some(page) = pages.get(slot) else { break };
                if failure.lock().unwrap_or_else(PoisonError::into_inner).is_some() {
                    break;
                }

                let outcome = std::fs::read(&page.image_path)
                    .map_err(ExtractionError::from)
                    .and_then(|image| ocr.recognize(page.index, &image));
                match outcome {
                    Ok(text) => results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(PageText {
                            page_number: page.index + 1,
                            text,
                        }),
                    Err(e) => {
                        warn!(page = page.index, error = %e, "Page recognition failed");
                        failure
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get_or_insert(e);
                        break;
                    }
                }
            });
        }
    });

    if let Some(e) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(e);
    }
    let mut recognized = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    recognized.sort_by_key(|p| p.page_number);
    Ok(recognized)
}

fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Remove scratch directories older than `min_age` left behind by a
/// process that did not shut down cleanly. Returns how many were removed.
pub fn cleanup_orphaned_scratch(root: &Path, min_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(SCRATCH_PREFIX) {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_dir() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < min_age {
            continue;
        }
        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Could not remove orphaned scratch dir"),
        }
    }

    if removed > 0 {
        info!(removed, "Removed orphaned scratch directories");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::pdfium::MockPdfRasterizer;
    use crate::pipeline::extraction::vision_ocr::EchoOcrEngine;

    const PDF: &[u8] = b"%PDF-1.7\n%fixture";

    fn extractor(
        rasterizer: MockPdfRasterizer,
        ocr: Arc<EchoOcrEngine>,
        workers: usize,
        root: &Path,
    ) -> TextExtractor {
        TextExtractor::new(Arc::new(rasterizer), ocr, 200, workers).with_scratch_root(root)
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn pages_joined_with_blank_line() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(
            MockPdfRasterizer::with_page_texts(&["first", "second", "third"]),
            Arc::new(EchoOcrEngine::new()),
            2,
            root.path(),
        );
        let text = ex.extract(PDF).unwrap();
        assert_eq!(text.full_text, "first\n\nsecond\n\nthird");
        assert_eq!(text.pages.len(), 3);
        assert_eq!(text.pages[2].page_number, 3);
    }

    #[test]
    fn page_order_preserved_when_recognition_finishes_out_of_order() {
        let root = tempfile::tempdir().unwrap();
        let texts = ["PAGE-1", "PAGE-2", "PAGE-3", "PAGE-4"];
        // Earlier pages take longer, so they finish last.
        let ocr = Arc::new(EchoOcrEngine::new().with_delay(|text| {
            let n: u64 = text.trim_start_matches("PAGE-").parse().unwrap_or(0);
            Duration::from_millis((5 - n) * 40)
        }));
        let ex = extractor(MockPdfRasterizer::with_page_texts(&texts), ocr.clone(), 4, root.path());

        let text = ex.extract(PDF).unwrap();

        let completion = ocr.completion_order();
        assert_ne!(completion, texts.to_vec(), "recognition should complete out of order");
        assert_eq!(text.full_text, "PAGE-1\n\nPAGE-2\n\nPAGE-3\n\nPAGE-4");
    }

    #[test]
    fn zero_page_pdf_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(MockPdfRasterizer::empty(), Arc::new(EchoOcrEngine::new()), 2, root.path());
        assert!(matches!(ex.extract(PDF), Err(ExtractionError::EmptyDocument)));
        assert!(is_empty_dir(root.path()), "scratch dir removed after failure");
    }

    #[test]
    fn scratch_removed_after_success() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(
            MockPdfRasterizer::with_page_texts(&["a"]),
            Arc::new(EchoOcrEngine::new()),
            1,
            root.path(),
        );
        ex.extract(PDF).unwrap();
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn ocr_failure_fails_whole_run_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(
            MockPdfRasterizer::with_page_texts(&["ok", "BROKEN", "ok"]),
            Arc::new(EchoOcrEngine::new().failing_on("BROKEN")),
            1,
            root.path(),
        );
        let err = ex.extract(PDF).unwrap_err();
        assert!(matches!(err, ExtractionError::OcrProcessing { page: 1, .. }));
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn blank_recognition_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(
            MockPdfRasterizer::with_page_texts(&["  ", "\n"]),
            Arc::new(EchoOcrEngine::new()),
            2,
            root.path(),
        );
        assert!(matches!(ex.extract(PDF), Err(ExtractionError::NoTextRecognized)));
    }

    #[test]
    fn image_is_recognized_as_single_page() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(MockPdfRasterizer::empty(), Arc::new(EchoOcrEngine::new()), 1, root.path());
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        jpeg.extend_from_slice(b" scanned note");
        let text = ex.extract(&jpeg).unwrap();
        assert_eq!(text.pages.len(), 1);
        assert!(text.full_text.contains("scanned note"));
    }

    #[test]
    fn unsupported_format_rejected() {
        let root = tempfile::tempdir().unwrap();
        let ex = extractor(MockPdfRasterizer::empty(), Arc::new(EchoOcrEngine::new()), 1, root.path());
        assert!(matches!(
            ex.extract(b"plain text file"),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn orphan_cleanup_only_touches_prefixed_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("casevault-abc123")).unwrap();
        std::fs::write(root.path().join("casevault-abc123").join("page-0001.png"), b"x").unwrap();
        std::fs::create_dir(root.path().join("other-dir")).unwrap();

        let removed = cleanup_orphaned_scratch(root.path(), Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(!root.path().join("casevault-abc123").exists());
        assert!(root.path().join("other-dir").exists());
    }

    #[test]
    fn orphan_cleanup_spares_recent_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("casevault-live")).unwrap();
        assert_eq!(cleanup_orphaned_scratch(root.path(), Duration::from_secs(3600)), 0);
        assert!(root.path().join("casevault-live").exists());
    }
}
