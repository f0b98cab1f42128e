use anyhow::Result;
use std::sync::Arc;

use crate::ocr::{RecognitionEngine, TesseractEngine};
use crate::pdf::{CommandRasterizer, PopplerExtractor, Rasterizer, VectorExtractor};
use crate::pipeline::Pipeline;
use crate::settings::Settings;

/// Shared, read-only state behind every request. The engine is built once
/// at startup and reused for all pages of all documents.
#[derive(Clone)]
pub struct ServerState {
    pub(crate) settings: Settings,
    pub(crate) engine: Arc<dyn RecognitionEngine + Send + Sync>,
    pub(crate) rasterizer: Arc<dyn Rasterizer + Send + Sync>,
    pub(crate) extractor: Arc<dyn VectorExtractor + Send + Sync>,
}

impl ServerState {
    /// State backed by tesseract, mutool/pdftoppm and pdftotext.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let engine = TesseractEngine::new(&settings.ocr_languages, settings.ocr_psm, settings.ocr_dpi)?;
        let rasterizer = CommandRasterizer::new(settings.ocr_dpi);
        Ok(Self {
            settings,
            engine: Arc::new(engine),
            rasterizer: Arc::new(rasterizer),
            extractor: Arc::new(PopplerExtractor),
        })
    }

    pub fn new(
        settings: Settings,
        engine: Arc<dyn RecognitionEngine + Send + Sync>,
        rasterizer: Arc<dyn Rasterizer + Send + Sync>,
        extractor: Arc<dyn VectorExtractor + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            engine,
            rasterizer,
            extractor,
        }
    }

    pub(crate) fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(
            self.engine.as_ref(),
            self.rasterizer.as_ref(),
            self.extractor.as_ref(),
            &self.settings,
        )
    }
}
