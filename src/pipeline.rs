use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::document::{DocumentResult, PageOutcome, page_key};
use crate::merge::Reconciler;
use crate::ocr::{PageLayout, RecognitionEngine, assemble_image_lines, assemble_vector_lines};
use crate::pdf::{Rasterizer, VectorExtractor, VectorPage};
use crate::settings::Settings;

/// Which transcription a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Image text healed with the PDF's own text.
    #[default]
    Merge,
    /// Image text only.
    Raster,
    /// PDF content text only.
    Vector,
}

/// Runs the recognition engine over every rendered page. A page whose
/// recognition fails is recorded as failed; the others go on. Detections
/// with malformed geometry only drop out of their own page, as warnings.
pub fn assemble_raster_pages(
    engine: &dyn RecognitionEngine,
    images: &[Vec<u8>],
    threshold: f32,
) -> DocumentResult {
    images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let key = page_key(index);
            let outcome = engine
                .recognize(image)
                .and_then(|detections| {
                    debug!("{}: {} detections", key, detections.len());
                    Ok(assemble_image_lines(&detections, threshold)?)
                });
            (key, settle(index, outcome))
        })
        .collect()
}

pub fn assemble_vector_pages(pages: &[VectorPage], threshold: f32) -> DocumentResult {
    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let outcome =
                assemble_vector_lines(&page.fragments, threshold).map_err(anyhow::Error::from);
            (page_key(index), settle(index, outcome))
        })
        .collect()
}

fn settle(index: usize, outcome: Result<PageLayout>) -> PageOutcome {
    match outcome {
        Ok(layout) => {
            let warnings = layout.warnings();
            for warning in &warnings {
                warn!("{}: {}", page_key(index), warning);
            }
            PageOutcome::text_with_warnings(layout.text(), warnings)
        }
        Err(err) => {
            warn!("{} failed: {:#}", page_key(index), err);
            PageOutcome::failed(format!("{:#}", err))
        }
    }
}

/// Wires the collaborators together for one PDF at a time.
pub struct Pipeline<'a> {
    engine: &'a dyn RecognitionEngine,
    rasterizer: &'a dyn Rasterizer,
    extractor: &'a dyn VectorExtractor,
    settings: &'a Settings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        engine: &'a dyn RecognitionEngine,
        rasterizer: &'a dyn Rasterizer,
        extractor: &'a dyn VectorExtractor,
        settings: &'a Settings,
    ) -> Self {
        Self {
            engine,
            rasterizer,
            extractor,
            settings,
        }
    }

    /// Source A: rendered pages read back by the recognition engine.
    pub fn raster_document(&self, pdf_path: &Path) -> Result<DocumentResult> {
        info!("raster: rendering {}", pdf_path.display());
        let images = self
            .rasterizer
            .render(pdf_path)
            .with_context(|| format!("failed to render {}", pdf_path.display()))?;
        info!("raster: recognizing {} pages", images.len());
        Ok(assemble_raster_pages(
            self.engine,
            &images,
            self.settings.image_line_threshold,
        ))
    }

    /// Source B: text lines taken from the PDF's own content.
    pub fn vector_document(&self, pdf_path: &Path) -> Result<DocumentResult> {
        info!("vector: extracting {}", pdf_path.display());
        let pages = self
            .extractor
            .extract(pdf_path)
            .with_context(|| format!("failed to extract text from {}", pdf_path.display()))?;
        info!("vector: assembling {} pages", pages.len());
        Ok(assemble_vector_pages(
            &pages,
            self.settings.vector_line_threshold,
        ))
    }

    /// Builds both transcriptions and heals A with B. Losing B entirely is
    /// not fatal: A comes back unchanged.
    pub fn extract_and_merge(&self, pdf_path: &Path, keywords: Vec<String>) -> Result<DocumentResult> {
        let raster = self.raster_document(pdf_path)?;
        let vector = match self.vector_document(pdf_path) {
            Ok(vector) => vector,
            Err(err) => {
                warn!("vector text unavailable, keeping raster text: {:#}", err);
                DocumentResult::default()
            }
        };
        let reconciler = Reconciler::new(keywords, self.settings.reconcile_rules());
        info!(
            "merge: {} pages against {} keywords",
            raster.len(),
            reconciler.keywords().len()
        );
        Ok(reconciler.merge_results(&raster, &vector))
    }

    pub fn run(&self, pdf_path: &Path, mode: Mode, keywords: Vec<String>) -> Result<DocumentResult> {
        match mode {
            Mode::Merge => self.extract_and_merge(pdf_path, keywords),
            Mode::Raster => self.raster_document(pdf_path),
            Mode::Vector => self.vector_document(pdf_path),
        }
    }
}
