//! PDF rasterization via Google PDFium.
//!
//! `PdfiumRasterizer` is stateless (`Send + Sync`). Each call loads a
//! fresh `Pdfium` handle because the upstream type is `!Send`; the OS
//! caches the library load so repeat binds are cheap.

use std::io::Cursor;
use std::path::Path;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{PdfRasterizer, RasterPage};
use super::ExtractionError;

/// Maximum width or height of a rendered page image.
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that the PDFium library can be bound. Used at startup to warn
/// early; summaries fail with `PdfRendering` until the library is present.
pub fn probe_library() -> Result<(), ExtractionError> {
    load_pdfium().map(|_| ())
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable, or its `pdfium/lib` subdirectory
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfRendering {
                page: 0,
                reason: format!("Failed to load PDFium from {path}: {e}"),
            }
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        for dir in [exe_dir.clone(), exe_dir.join("pdfium").join("lib")] {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %dir.display(), "Loaded PDFium next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings =
        Pdfium::bind_to_system_library().map_err(|e| ExtractionError::PdfRendering {
            page: 0,
            reason: format!(
                "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
            ),
        })?;
    Ok(Pdfium::new(bindings))
}

fn map_load_error(e: PdfiumError) -> ExtractionError {
    let lower = e.to_string().to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfRendering {
            page: 0,
            reason: format!("Failed to load PDF: {e}"),
        }
    }
}

/// Pixel dimensions for a page at `dpi`, both clamped to
/// `[1, MAX_DIMENSION_PX]` with aspect ratio preserved.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<RasterPage>, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(map_load_error)?;

        let mut rendered = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let (target_w, target_h) =
                compute_render_dimensions(page.width().value, page.height().value, dpi);
            if target_w == MAX_DIMENSION_PX || target_h == MAX_DIMENSION_PX {
                warn!(page = index, width = target_w, height = target_h, "Page dimensions capped");
            }

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| ExtractionError::PdfRendering {
                    page: index,
                    reason: format!("Rendering failed: {e}"),
                })?;

            let mut cursor = Cursor::new(Vec::new());
            bitmap
                .as_image()
                .write_to(&mut cursor, ImageOutputFormat::Png)
                .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;

            let image_path = out_dir.join(format!("page-{:04}.png", index + 1));
            std::fs::write(&image_path, cursor.into_inner())?;
            rendered.push(RasterPage { index, image_path });
        }

        debug!(pages = rendered.len(), dpi, "Rasterized PDF");
        Ok(rendered)
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Rasterizer that writes configured bytes as page "images".
///
/// Pair with `EchoOcrEngine` so each page's recognized text is exactly
/// the configured content. Rejects input that is not a PDF.
pub struct MockPdfRasterizer {
    pages: Vec<Vec<u8>>,
}

impl MockPdfRasterizer {
    pub fn with_page_texts(texts: &[&str]) -> Self {
        Self {
            pages: texts.iter().map(|t| t.as_bytes().to_vec()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { pages: Vec::new() }
    }
}

impl PdfRasterizer for MockPdfRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        _dpi: u32,
    ) -> Result<Vec<RasterPage>, ExtractionError> {
        let source = std::fs::read(pdf_path)?;
        if !source.starts_with(b"%PDF") {
            return Err(ExtractionError::PdfRendering {
                page: 0,
                reason: "Failed to load PDF: not a PDF file".into(),
            });
        }

        self.pages
            .iter()
            .enumerate()
            .map(|(index, content)| {
                let image_path = out_dir.join(format!("page-{:04}.png", index + 1));
                std::fs::write(&image_path, content)?;
                Ok(RasterPage { index, image_path })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_at_200dpi() {
        let (w, h) = compute_render_dimensions(595.0, 842.0, 200);
        assert!(w > 1600 && w < 1700, "A4 width at 200dpi: got {w}");
        assert!(h > 2300 && h < 2400, "A4 height at 200dpi: got {h}");
    }

    #[test]
    fn letter_at_200dpi() {
        let (w, h) = compute_render_dimensions(612.0, 792.0, 200);
        assert!(w > 1650 && w < 1750, "Letter width at 200dpi: got {w}");
        assert!(h > 2150 && h < 2250, "Letter height at 200dpi: got {h}");
    }

    #[test]
    fn oversized_page_is_capped_with_aspect_ratio() {
        let (w, h) = compute_render_dimensions(5000.0, 10000.0, 200);
        assert!(w <= MAX_DIMENSION_PX && h <= MAX_DIMENSION_PX);
        let ratio = h as f32 / w as f32;
        assert!((ratio - 2.0).abs() < 0.15, "aspect ratio ~2:1, got {ratio}");
    }

    #[test]
    fn zero_sized_page_clamped_to_one_pixel() {
        let (w, h) = compute_render_dimensions(0.0, 0.0, 200);
        assert_eq!((w, h), (1, 1));
    }

    #[test]
    fn mock_writes_one_file_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("in.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();

        let pages = MockPdfRasterizer::with_page_texts(&["one", "two"])
            .rasterize(&pdf, dir.path(), 200)
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].index, 1);
        assert_eq!(std::fs::read(&pages[1].image_path).unwrap(), b"two");
    }

    #[test]
    fn mock_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        std::fs::write(&path, b"GIF89a").unwrap();
        let err = MockPdfRasterizer::with_page_texts(&["x"])
            .rasterize(&path, dir.path(), 200)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PdfRendering { .. }));
    }
}
