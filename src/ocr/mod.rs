mod engine;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use engine::{
    Anchor, Geometry, IMAGE_LINE_THRESHOLD, LayoutOptions, Orientation, PageLayout,
    RejectedDetection, TesseractEngine, VECTOR_LINE_THRESHOLD, assemble_image_lines,
    assemble_lines, assemble_vector_lines, list_tesseract_languages, render_page,
};
pub(crate) use engine::rect_from_top_down;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Corner points of a detection in image space, normally four of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub points: Vec<Point>,
}

/// Axis-aligned box in content-stream space (`y1` is the top edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection<G> {
    pub text: String,
    pub geometry: G,
    /// Position in the engine's output; breaks ties between identical coordinates.
    pub order: usize,
}

impl<G> Detection<G> {
    pub fn new(text: impl Into<String>, geometry: G, order: usize) -> Self {
        Self {
            text: text.into(),
            geometry,
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("detection has {found} corner points, expected {expected}")]
    WrongCornerCount { expected: usize, found: usize },
    #[error("detection has a non-finite coordinate")]
    NonFiniteCoordinate,
    #[error("line threshold must be a finite, non-negative number (got {0})")]
    InvalidThreshold(f32),
}

/// An image text recogniser: one page image in, unordered detections out.
///
/// Engines are expensive to set up; build one and pass it by reference to
/// every page that needs it.
pub trait RecognitionEngine {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Detection<Quad>>>;
}
