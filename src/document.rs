use indexmap::IndexMap;
use serde::Serialize;

/// Key of the page at zero-based `index`: `page1`, `page2`, ...
pub fn page_key(index: usize) -> String {
    format!("page{}", index + 1)
}

/// Page texts in page order, serialized as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    pages: IndexMap<String, String>,
}

impl Document {
    /// Keys the texts `page1..pageN` in the given order.
    pub fn from_pages(texts: impl IntoIterator<Item = String>) -> Self {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| (page_key(index), text))
            .collect()
    }

    /// Replaces the text of an existing key in place, otherwise appends.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.pages.insert(key.into(), text.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pages.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pages
            .iter()
            .map(|(key, text)| (key.as_str(), text.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<(String, String)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Result of producing one page: its text, or why it could not be produced.
///
/// A text page may still carry warnings about detections that were left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

impl PageOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_warnings(text, Vec::new())
    }

    pub fn text_with_warnings(text: impl Into<String>, warnings: Vec<String>) -> Self {
        PageOutcome::Text {
            text: text.into(),
            warnings,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        PageOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PageOutcome::Text { text, .. } => Some(text.as_str()),
            PageOutcome::Failed { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            PageOutcome::Text { warnings, .. } => warnings,
            PageOutcome::Failed { .. } => &[],
        }
    }
}

/// Per-page outcomes of one document, in page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentResult {
    pages: IndexMap<String, PageOutcome>,
}

impl DocumentResult {
    pub fn push(&mut self, key: impl Into<String>, outcome: PageOutcome) {
        self.pages.insert(key.into(), outcome);
    }

    pub fn get(&self, key: &str) -> Option<&PageOutcome> {
        self.pages.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PageOutcome)> {
        self.pages
            .iter()
            .map(|(key, outcome)| (key.as_str(), outcome))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages that produced text.
    pub fn document(&self) -> Document {
        self.pages
            .iter()
            .filter_map(|(key, outcome)| {
                outcome
                    .as_text()
                    .map(|text| (key.clone(), text.to_string()))
            })
            .collect()
    }

    /// Page keys that failed, with their reasons.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.pages
            .iter()
            .filter_map(|(key, outcome)| match outcome {
                PageOutcome::Failed { reason } => Some((key.as_str(), reason.as_str())),
                PageOutcome::Text { .. } => None,
            })
            .collect()
    }

    /// Pages that produced text but skipped some detections.
    pub fn warnings(&self) -> IndexMap<String, Vec<String>> {
        self.pages
            .iter()
            .filter(|(_, outcome)| !outcome.warnings().is_empty())
            .map(|(key, outcome)| (key.clone(), outcome.warnings().to_vec()))
            .collect()
    }
}

impl FromIterator<(String, PageOutcome)> for DocumentResult {
    fn from_iter<I: IntoIterator<Item = (String, PageOutcome)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Flat report of a [`DocumentResult`]: page texts at the top level, failed
/// pages under `errors` and skipped detections under `warnings`. Both are
/// left out when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageReport {
    #[serde(flatten)]
    pub pages: Document,
    #[serde(skip_serializing_if = "Document::is_empty")]
    pub errors: Document,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub warnings: IndexMap<String, Vec<String>>,
}

impl From<&DocumentResult> for PageReport {
    fn from(result: &DocumentResult) -> Self {
        let errors = result
            .failures()
            .into_iter()
            .map(|(key, reason)| (key.to_string(), reason.to_string()))
            .collect();
        Self {
            pages: result.document(),
            errors,
            warnings: result.warnings(),
        }
    }
}
