use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::merge::ReconcileRules;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ocr_languages: Vec<String>,
    pub ocr_psm: u32,
    pub ocr_dpi: u32,
    pub image_line_threshold: f32,
    pub vector_line_threshold: f32,
    pub keywords: Vec<String>,
    pub similarity_threshold: f64,
    pub truncation_marker: Option<String>,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr_languages: vec!["eng".to_string(), "deu".to_string()],
            ocr_psm: 3,
            ocr_dpi: 200,
            image_line_threshold: crate::ocr::IMAGE_LINE_THRESHOLD,
            vector_line_threshold: crate::ocr::VECTOR_LINE_THRESHOLD,
            keywords: vec![
                "Umklemmbar tappings".to_string(),
                "Betriebsanzeige operating indicator".to_string(),
                "Restwelligkeit ripple".to_string(),
            ],
            similarity_threshold: crate::merge::DEFAULT_SIMILARITY_THRESHOLD,
            truncation_marker: Some(crate::merge::DEFAULT_TRUNCATION_MARKER.to_string()),
            server_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    pdf: Option<PdfSettings>,
    merge: Option<MergeSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<Vec<String>>,
    psm: Option<u32>,
    dpi: Option<u32>,
    line_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfSettings {
    line_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    keywords: Option<Vec<String>>,
    similarity_threshold: Option<f64>,
    truncation_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

/// Builds settings from the embedded defaults, then `settings.toml` and
/// `settings.local.toml` in the working directory, then the same pair in
/// `~/.pdf-ocr-merge`, then `extra_path`. Later files win per key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn reconcile_rules(&self) -> ReconcileRules {
        ReconcileRules {
            similarity_threshold: self.similarity_threshold,
            truncation_marker: self.truncation_marker.clone(),
        }
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = ocr.languages {
                if !languages.is_empty() {
                    self.ocr_languages = languages;
                }
            }
            if let Some(psm) = ocr.psm {
                self.ocr_psm = psm;
            }
            if let Some(dpi) = ocr.dpi {
                if dpi > 0 {
                    self.ocr_dpi = dpi;
                }
            }
            if let Some(threshold) = ocr.line_threshold {
                if threshold >= 0.0 {
                    self.image_line_threshold = threshold;
                }
            }
        }
        if let Some(pdf) = incoming.pdf {
            if let Some(threshold) = pdf.line_threshold {
                if threshold >= 0.0 {
                    self.vector_line_threshold = threshold;
                }
            }
        }
        if let Some(merge) = incoming.merge {
            if let Some(keywords) = merge.keywords {
                self.keywords = keywords;
            }
            if let Some(threshold) = merge.similarity_threshold {
                if (0.0..=1.0).contains(&threshold) {
                    self.similarity_threshold = threshold;
                }
            }
            if let Some(marker) = merge.truncation_marker {
                self.truncation_marker = if marker.is_empty() { None } else { Some(marker) };
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr;
                }
            }
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".pdf-ocr-merge"))
        }
    })
}
