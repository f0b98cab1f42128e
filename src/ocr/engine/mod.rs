mod geom;
mod layout;
mod parse;
mod tesseract;
mod text;

use anyhow::{Context, Result};
use std::io::Write;
use tracing::debug;

use crate::ocr::{Detection, Quad, RecognitionEngine};

pub use geom::{Anchor, Geometry};
pub use layout::{
    IMAGE_LINE_THRESHOLD, LayoutOptions, Orientation, PageLayout, RejectedDetection,
    VECTOR_LINE_THRESHOLD, assemble_image_lines, assemble_lines, assemble_vector_lines,
    render_page,
};
pub use tesseract::list_tesseract_languages;

pub(crate) use geom::rect_from_top_down;

/// Recognition through the `tesseract` command line tool.
///
/// Language resolution runs `tesseract --list-langs` once, in `new`; the
/// engine is then reused for every page.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    psm: u32,
    dpi: u32,
}

impl TesseractEngine {
    pub fn new(languages: &[String], psm: u32, dpi: u32) -> Result<Self> {
        let languages = tesseract::normalize_ocr_languages(languages)?;
        debug!("tesseract languages: {}", languages);
        Ok(Self {
            languages,
            psm,
            dpi,
        })
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Detection<Quad>>> {
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        tmp.write_all(image_bytes)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush()
            .with_context(|| "failed to flush temp image for OCR")?;

        let tsv = tesseract::run_tesseract_tsv(tmp.path(), &self.languages, self.psm, self.dpi)?;
        let detections = parse::parse_tsv_detections(&tsv)?;
        debug!(
            "tesseract: {} bytes -> {} detections",
            image_bytes.len(),
            detections.len()
        );
        Ok(detections)
    }
}
