use anyhow::Context;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::document::DocumentResult;
use crate::merge::keywords_from_json;
use crate::pipeline::Mode;

use super::models::ErrorResponse;
use super::state::ServerState;
use super::upload::PdfUpload;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

/// Validated request: the PDF already on disk and the anchor list settled.
pub(crate) struct PreparedRequest {
    pub(crate) pdf: NamedTempFile,
    pub(crate) keywords: Vec<String>,
}

pub(crate) fn prepare_request(
    state: &ServerState,
    upload: PdfUpload,
) -> Result<PreparedRequest, ServerError> {
    if upload.bytes.is_empty() {
        return Err(ServerError::bad_request("pdf data is empty"));
    }

    let mut pdf = tempfile::Builder::new()
        .prefix("pdf-ocr-merge-")
        .suffix(".pdf")
        .tempfile()
        .with_context(|| "failed to create temp pdf")?;
    pdf.write_all(&upload.bytes)
        .with_context(|| "failed to write temp pdf")?;

    Ok(PreparedRequest {
        pdf,
        keywords: resolve_keywords(upload.keywords.as_ref(), &state.settings.keywords),
    })
}

pub(crate) fn resolve_keywords(raw: Option<&serde_json::Value>, defaults: &[String]) -> Vec<String> {
    match raw {
        Some(serde_json::Value::String(text)) => keywords_from_json(text, defaults),
        Some(value @ serde_json::Value::Array(_)) => {
            serde_json::from_value::<Vec<String>>(value.clone())
                .unwrap_or_else(|_| defaults.to_vec())
        }
        _ => defaults.to_vec(),
    }
}

/// Blocking: renders, recognizes and merges. Run it off the async runtime.
pub(crate) fn process_request(
    state: &ServerState,
    upload: PdfUpload,
    mode: Mode,
) -> Result<DocumentResult, ServerError> {
    let prepared = prepare_request(state, upload)?;
    let result = state
        .pipeline()
        .run(prepared.pdf.path(), mode, prepared.keywords)?;
    if result.is_empty() {
        return Err(ServerError::bad_request("pdf has no pages"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Vec<String> {
        vec!["Restwelligkeit ripple".to_string()]
    }

    #[test]
    fn keywords_accept_array_or_encoded_string() {
        let from_array = resolve_keywords(Some(&json!(["a b", "c d"])), &defaults());
        assert_eq!(from_array, vec!["a b", "c d"]);

        let from_string = resolve_keywords(Some(&json!("[\"x y\"]")), &defaults());
        assert_eq!(from_string, vec!["x y"]);

        let empty = resolve_keywords(Some(&json!([])), &defaults());
        assert!(empty.is_empty());
    }

    #[test]
    fn malformed_keywords_fall_back_to_defaults() {
        assert_eq!(resolve_keywords(None, &defaults()), defaults());
        assert_eq!(resolve_keywords(Some(&json!(42)), &defaults()), defaults());
        assert_eq!(resolve_keywords(Some(&json!([1, 2])), &defaults()), defaults());
        assert_eq!(resolve_keywords(Some(&json!("not json")), &defaults()), defaults());
    }
}
