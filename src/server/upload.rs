use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::models::ProcessRequest;
use super::process::ServerError;

/// A PDF and its anchor keywords as sent by a client.
///
/// Accepts either a `multipart/form-data` body with a `file` part and an
/// optional `keywords` part holding a JSON array, or a JSON body with
/// `data_base64` and `keywords`.
#[derive(Debug)]
pub(crate) struct PdfUpload {
    pub(crate) bytes: Vec<u8>,
    pub(crate) keywords: Option<serde_json::Value>,
}

impl PdfUpload {
    pub(crate) fn from_json(request: ProcessRequest) -> Result<Self, ServerError> {
        let encoded = request
            .data_base64
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ServerError::bad_request("data_base64 is required"))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|err| ServerError::bad_request(format!("invalid base64 data: {}", err)))?;
        Ok(Self {
            bytes,
            keywords: request.keywords,
        })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut bytes = None;
        let mut keywords = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ServerError::bad_request(err.body_text()))?
        {
            match field.name() {
                Some("file") => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|err| ServerError::bad_request(err.body_text()))?;
                    bytes = Some(data.to_vec());
                }
                Some("keywords") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|err| ServerError::bad_request(err.body_text()))?;
                    keywords = Some(serde_json::Value::String(text));
                }
                _ => {}
            }
        }
        let bytes = bytes.ok_or_else(|| ServerError::bad_request("file is required"))?;
        Ok(Self { bytes, keywords })
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("multipart/form-data"))
}

#[axum::async_trait]
impl<S> FromRequest<S> for PdfUpload
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| ServerError::bad_request(err.body_text()))?;
            return Self::from_multipart(multipart).await;
        }
        let Json(request) = Json::<ProcessRequest>::from_request(req, state)
            .await
            .map_err(|err| ServerError::new(err.status(), err.body_text()))?;
        Self::from_json(request)
    }
}
