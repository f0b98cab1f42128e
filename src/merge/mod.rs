mod similarity;

use serde::Serialize;
use tracing::{debug, trace};

use crate::document::{Document, DocumentResult, PageOutcome};

pub use similarity::similarity;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_TRUNCATION_MARKER: &str = "( -";

/// Tunables for line replacement. A line only counts as a match when its
/// similarity is strictly above `similarity_threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileRules {
    pub similarity_threshold: f64,
    /// Suffix marking a line the image engine cut short. `None` turns the rule off.
    pub truncation_marker: Option<String>,
}

impl Default for ReconcileRules {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            truncation_marker: Some(DEFAULT_TRUNCATION_MARKER.to_string()),
        }
    }
}

/// Where a reconciled line came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LineSource {
    Original,
    Anchor { keyword: String },
    Truncation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledLine {
    pub text: String,
    #[serde(flatten)]
    pub source: LineSource,
}

/// Heals known failure terms in a broad transcription (A) with lines from a
/// precise one (B), anchored on caller-supplied keywords.
#[derive(Debug, Clone)]
pub struct Reconciler {
    keywords: Vec<String>,
    rules: ReconcileRules,
}

impl Reconciler {
    pub fn new(keywords: Vec<String>, rules: ReconcileRules) -> Self {
        Self { keywords, rules }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn reconcile_page(&self, a_text: &str, b_text: &str) -> String {
        self.reconcile_page_traced(a_text, b_text)
            .into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Same as [`Reconciler::reconcile_page`], keeping the reason behind every line.
    pub fn reconcile_page_traced(&self, a_text: &str, b_text: &str) -> Vec<ReconciledLine> {
        let b_lines = b_text.split('\n').collect::<Vec<_>>();
        a_text
            .split('\n')
            .map(|a_line| {
                let line = self.reconcile_line(a_line, &b_lines);
                if line.source != LineSource::Original {
                    trace!("replaced {:?} with {:?} ({:?})", a_line, line.text, line.source);
                }
                line
            })
            .collect()
    }

    fn reconcile_line(&self, a_line: &str, b_lines: &[&str]) -> ReconciledLine {
        if let Some(line) = self.anchor_match(a_line, b_lines) {
            return line;
        }
        if let Some(line) = self.truncation_match(a_line, b_lines) {
            return line;
        }
        ReconciledLine {
            text: a_line.to_string(),
            source: LineSource::Original,
        }
    }

    fn anchor_match(&self, a_line: &str, b_lines: &[&str]) -> Option<ReconciledLine> {
        for keyword in &self.keywords {
            if !self.is_similar(a_line, keyword) {
                continue;
            }
            if let Some(b_line) = b_lines.iter().find(|b_line| self.is_similar(b_line, keyword)) {
                return Some(ReconciledLine {
                    text: b_line.to_string(),
                    source: LineSource::Anchor {
                        keyword: keyword.clone(),
                    },
                });
            }
        }
        None
    }

    fn truncation_match(&self, a_line: &str, b_lines: &[&str]) -> Option<ReconciledLine> {
        let marker = self.rules.truncation_marker.as_deref()?;
        if marker.is_empty() || !a_line.trim().ends_with(marker) {
            return None;
        }
        b_lines
            .iter()
            .find(|b_line| self.is_similar(a_line, b_line))
            .map(|b_line| ReconciledLine {
                text: b_line.to_string(),
                source: LineSource::Truncation,
            })
    }

    fn is_similar(&self, left: &str, right: &str) -> bool {
        similarity(left, right) > self.rules.similarity_threshold
    }

    /// Merges page by page. Keys and order follow `a`; pages missing from
    /// `b` are copied from `a` unchanged.
    pub fn merge_documents(&self, a: &Document, b: &Document) -> Document {
        a.iter()
            .map(|(key, a_text)| {
                let text = match b.get(key) {
                    Some(b_text) => self.reconcile_page(a_text, b_text),
                    None => a_text.to_string(),
                };
                (key.to_string(), text)
            })
            .collect()
    }

    /// Like [`Reconciler::merge_documents`] over per-page outcomes: a failed
    /// A page stays failed, a failed or missing B page lets A through.
    /// Warnings from both sides are kept, A's first.
    pub fn merge_results(&self, a: &DocumentResult, b: &DocumentResult) -> DocumentResult {
        a.iter()
            .map(|(key, outcome)| {
                let merged = match (outcome, b.get(key)) {
                    (
                        PageOutcome::Text {
                            text: a_text,
                            warnings: a_warnings,
                        },
                        Some(PageOutcome::Text {
                            text: b_text,
                            warnings: b_warnings,
                        }),
                    ) => {
                        let warnings = a_warnings.iter().chain(b_warnings).cloned().collect();
                        PageOutcome::text_with_warnings(self.reconcile_page(a_text, b_text), warnings)
                    }
                    (PageOutcome::Text { .. }, other) => {
                        if let Some(PageOutcome::Failed { reason }) = other {
                            debug!("{}: precise text unavailable ({}), keeping image text", key, reason);
                        }
                        outcome.clone()
                    }
                    (failed, _) => failed.clone(),
                };
                (key.to_string(), merged)
            })
            .collect()
    }
}

/// Reads a JSON array of strings; anything else falls back to `defaults`.
pub fn keywords_from_json(raw: &str, defaults: &[String]) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(keywords) => keywords,
        Err(err) => {
            debug!("ignoring keyword list ({}), using defaults", err);
            defaults.to_vec()
        }
    }
}
