use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::document::{DocumentResult, PageReport};
use crate::pipeline::Mode;

use super::models::TextByPageResponse;
use super::process::{ServerError, process_request};
use super::state::ServerState;
use super::upload::PdfUpload;

/// Largest request body accepted, base64 or form encoded.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub async fn run_server(state: ServerState, addr: String) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Every processing route takes a multipart form (`file`, `keywords`) or a
/// JSON body (`data_base64`, `keywords`). `/process-pdf-easyocr` and
/// `/process-pdf-pdfminer` are the older names of the raster and vector
/// routes.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/process_pdf", post(process_pdf))
        .route("/process-pdf-raster", post(process_pdf_raster))
        .route("/process-pdf-easyocr", post(process_pdf_raster))
        .route("/process-pdf-vector", post(process_pdf_vector))
        .route("/process-pdf-pdfminer", post(process_pdf_vector))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

async fn process_pdf(
    State(state): State<Arc<ServerState>>,
    upload: PdfUpload,
) -> Result<Json<PageReport>, ServerError> {
    let result = run_blocking(state, upload, Mode::Merge).await?;
    Ok(Json(PageReport::from(&result)))
}

async fn process_pdf_raster(
    State(state): State<Arc<ServerState>>,
    upload: PdfUpload,
) -> Result<Json<TextByPageResponse>, ServerError> {
    let result = run_blocking(state, upload, Mode::Raster).await?;
    Ok(Json(text_by_page(&result)))
}

async fn process_pdf_vector(
    State(state): State<Arc<ServerState>>,
    upload: PdfUpload,
) -> Result<Json<TextByPageResponse>, ServerError> {
    let result = run_blocking(state, upload, Mode::Vector).await?;
    Ok(Json(text_by_page(&result)))
}

fn text_by_page(result: &DocumentResult) -> TextByPageResponse {
    let report = PageReport::from(result);
    TextByPageResponse {
        text_by_page: report.pages,
        errors: report.errors,
        warnings: report.warnings,
    }
}

async fn run_blocking(
    state: Arc<ServerState>,
    upload: PdfUpload,
    mode: Mode,
) -> Result<DocumentResult, ServerError> {
    tokio::task::spawn_blocking(move || process_request(state.as_ref(), upload, mode))
        .await
        .map_err(|err| ServerError::internal(format!("server task failed: {}", err)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{Detection, Point, Quad, RecognitionEngine, Rect};
    use crate::pdf::{Rasterizer, VectorExtractor, VectorPage};
    use crate::server::upload::tests::{form_request, json_request, upload};
    use crate::settings::Settings;
    use anyhow::anyhow;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::json;
    use std::path::Path;

    struct LineEngine;

    impl RecognitionEngine for LineEngine {
        fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<Detection<Quad>>> {
            if image_bytes == b"blank" {
                return Err(anyhow!("unreadable page"));
            }
            let corners = |y: f32| Quad {
                points: vec![
                    Point { x: 5.0, y },
                    Point { x: 90.0, y },
                    Point { x: 90.0, y: y + 8.0 },
                    Point { x: 5.0, y: y + 8.0 },
                ],
            };
            Ok(vec![
                Detection::new("Restweligkeit riple", corners(30.0), 0),
                Detection::new("Nennspannung", corners(10.0), 1),
            ])
        }
    }

    struct TwoPages;

    impl Rasterizer for TwoPages {
        fn render(&self, pdf_path: &Path) -> Result<Vec<Vec<u8>>> {
            assert!(pdf_path.exists());
            Ok(vec![b"page".to_vec(), b"blank".to_vec()])
        }
    }

    struct ContentText;

    impl VectorExtractor for ContentText {
        fn extract(&self, _pdf_path: &Path) -> Result<Vec<VectorPage>> {
            let rect = |top: f32| Rect {
                x0: 5.0,
                y0: top - 8.0,
                x1: 90.0,
                y1: top,
            };
            Ok(vec![VectorPage {
                fragments: vec![
                    Detection::new("Nennspannung", rect(800.0), 0),
                    Detection::new("Restwelligkeit ripple", rect(780.0), 1),
                ],
            }])
        }
    }

    fn state() -> Arc<ServerState> {
        Arc::new(ServerState::new(
            Settings::default(),
            Arc::new(LineEngine),
            Arc::new(TwoPages),
            Arc::new(ContentText),
        ))
    }

    async fn json_upload(body: serde_json::Value) -> PdfUpload {
        upload(json_request(body)).await.expect("upload")
    }

    #[tokio::test]
    async fn merged_response_heals_pages_and_lists_failures() {
        let body = json!({ "data_base64": BASE64.encode(b"%PDF-1.4") });
        let Json(response) = process_pdf(State(state()), json_upload(body).await)
            .await
            .expect("response");

        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(value["page1"], "Nennspannung\nRestwelligkeit ripple");
        assert_eq!(value["errors"]["page2"], "unreadable page");
    }

    #[tokio::test]
    async fn empty_keyword_list_disables_healing() {
        let body = json!({ "data_base64": BASE64.encode(b"%PDF-1.4"), "keywords": [] });
        let Json(response) = process_pdf(State(state()), json_upload(body).await)
            .await
            .expect("response");
        assert_eq!(
            response.pages.get("page1"),
            Some("Nennspannung\nRestweligkeit riple")
        );
    }

    #[tokio::test]
    async fn form_upload_with_keyword_string_heals_pages() {
        let form = upload(form_request(Some(b"%PDF-1.4"), Some(r#"["Nennspannung"]"#)))
            .await
            .expect("upload");
        let Json(response) = process_pdf(State(state()), form)
            .await
            .expect("response");
        assert_eq!(
            response.pages.get("page1"),
            Some("Nennspannung\nRestweligkeit riple")
        );

        let form = upload(form_request(Some(b"%PDF-1.4"), None))
            .await
            .expect("upload");
        let Json(response) = process_pdf(State(state()), form)
            .await
            .expect("response");
        assert_eq!(
            response.pages.get("page1"),
            Some("Nennspannung\nRestwelligkeit ripple")
        );
    }

    #[tokio::test]
    async fn vector_endpoint_wraps_pages() {
        let form = upload(form_request(Some(b"%PDF-1.4"), None))
            .await
            .expect("upload");
        let Json(response) = process_pdf_vector(State(state()), form)
            .await
            .expect("response");

        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(
            value,
            json!({ "text_by_page": { "page1": "Nennspannung\nRestwelligkeit ripple" } })
        );
    }

    #[tokio::test]
    async fn empty_pdf_is_a_bad_request() {
        let body = json!({ "data_base64": "" });
        let err = upload(json_request(body)).await.expect_err("missing data");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let form = upload(form_request(Some(b""), None))
            .await
            .expect("upload");
        let err = process_pdf_raster(State(state()), form)
            .await
            .expect_err("empty pdf");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn server_errors_render_as_json() {
        let response = ServerError::bad_request("file is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
