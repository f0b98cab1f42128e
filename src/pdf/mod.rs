mod bbox;
mod render;

use anyhow::Result;
use std::path::Path;

use crate::ocr::{Detection, Rect};

pub use bbox::PopplerExtractor;
pub use render::CommandRasterizer;

/// Text lines of one page as found in the PDF's content stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorPage {
    pub fragments: Vec<Detection<Rect>>,
}

/// Produces positioned horizontal text lines, bottom-up coordinates, one entry per page.
pub trait VectorExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<Vec<VectorPage>>;
}

/// Renders every page of a PDF to an encoded image.
pub trait Rasterizer {
    fn render(&self, pdf_path: &Path) -> Result<Vec<Vec<u8>>>;
}
