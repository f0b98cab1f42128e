use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::Document;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ProcessRequest {
    pub(crate) data_base64: Option<String>,
    /// A JSON array of strings, or a string holding one. Anything else
    /// means the configured defaults.
    pub(crate) keywords: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextByPageResponse {
    pub(crate) text_by_page: Document,
    #[serde(skip_serializing_if = "Document::is_empty")]
    pub(crate) errors: Document,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub(crate) warnings: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
