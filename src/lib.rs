use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod document;
pub mod logging;
pub mod merge;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod server;
pub mod settings;

pub use document::{Document, DocumentResult, PageOutcome, PageReport};
pub use merge::{ReconcileRules, Reconciler};
pub use pipeline::{Mode, Pipeline};
pub use settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub data: PathBuf,
    pub mode: Mode,
    /// Anchor keywords given one by one; wins over `keywords_json`.
    pub keywords: Vec<String>,
    pub keywords_json: Option<String>,
    pub settings_path: Option<String>,
    pub json: bool,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if !config.data.is_file() {
        return Err(anyhow!("pdf not found: {}", config.data.display()));
    }
    let keywords = resolve_keywords(&config, &settings);

    let engine =
        ocr::TesseractEngine::new(&settings.ocr_languages, settings.ocr_psm, settings.ocr_dpi)?;
    let rasterizer = pdf::CommandRasterizer::new(settings.ocr_dpi);
    let extractor = pdf::PopplerExtractor;
    let pipeline = Pipeline::new(&engine, &rasterizer, &extractor, &settings);

    info!("processing {} ({:?})", config.data.display(), config.mode);
    let result = pipeline.run(&config.data, config.mode, keywords)?;
    if !result.is_empty() && result.failures().len() == result.len() {
        let reasons = result
            .failures()
            .into_iter()
            .map(|(key, reason)| format!("{}: {}", key, reason))
            .collect::<Vec<_>>();
        return Err(anyhow!("no page produced text\n{}", reasons.join("\n")));
    }
    format_output(&result, config.json)
}

fn resolve_keywords(config: &Config, settings: &Settings) -> Vec<String> {
    if !config.keywords.is_empty() {
        return config.keywords.clone();
    }
    match config.keywords_json.as_deref() {
        Some(raw) => merge::keywords_from_json(raw, &settings.keywords),
        None => settings.keywords.clone(),
    }
}

/// Plain text prints each page under a `--- pageN ---` header, with skipped
/// detections as `! ` lines after the text; JSON is an object of page texts
/// with failed pages under `errors` and skipped detections under `warnings`.
pub fn format_output(result: &DocumentResult, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(&PageReport::from(result))?);
    }

    let mut sections = Vec::new();
    for (key, outcome) in result.iter() {
        match outcome {
            PageOutcome::Text { text, warnings } => {
                let mut section = format!("--- {} ---\n{}", key, text);
                for warning in warnings {
                    section.push_str("\n! ");
                    section.push_str(warning);
                }
                sections.push(section)
            }
            PageOutcome::Failed { reason } => {
                sections.push(format!("--- {} (failed) ---\n{}", key, reason))
            }
        }
    }
    Ok(sections.join("\n\n"))
}
