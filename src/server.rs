//! HTTP API and embedded browser page.
//!
//! ## Endpoints
//! - `GET  /`                 - upload page (KaTeX-rendered results, DOCX button)
//! - `GET  /api/health`       - liveness probe, `{"ok": true}`
//! - `POST /api/convert`      - multipart field `pdf` → `{"success": true, ...ConversionOutput}`
//! - `POST /api/download-docx`- `{questions, answer_key?, export?}` → `.docx` attachment
//!
//! Each conversion request owns the temp file its upload is spooled into and
//! drops it when the handler returns. Shared state is read-only, so requests
//! run fully in parallel.

use crate::config::ConversionConfig;
use crate::convert::convert_with_input;
use crate::error::Pdf2QuizError;
use crate::export::{export_docx, ExportOptions, DOCX_CONTENT_TYPE};
use crate::output::{AnswerMap, Question};
use crate::pipeline::input::ResolvedInput;
use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

static INDEX_HTML: &str = include_str!("../static/index.html");

/// Multipart field carrying the uploaded PDF.
pub const UPLOAD_FIELD: &str = "pdf";

// ── Configuration ────────────────────────────────────────────────────────

/// Listener and upload settings for [`serve`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Default: `127.0.0.1:4000`.
    pub bind: SocketAddr,
    /// Directory for spooled uploads. `None` uses the system temp dir.
    pub upload_dir: Option<PathBuf>,
    /// Request body limit for uploads. Default: 50 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 4000)),
            upload_dir: None,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Shared, read-only handler state.
#[derive(Debug)]
pub struct AppState {
    pub conversion: ConversionConfig,
    pub server: ServerConfig,
}

// ── Router ───────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.server.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/convert", post(convert_pdf))
        .route("/api/download-docx", post(download_docx))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(server: ServerConfig, conversion: ConversionConfig) -> Result<(), Pdf2QuizError> {
    if !conversion.has_credentials() {
        warn!("Mathpix credentials are not configured; /api/convert will fail");
    }
    if let Some(ref dir) = server.upload_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Pdf2QuizError::Internal(format!("upload dir {}: {e}", dir.display())))?;
    }

    let addr = server.bind;
    let app = router(Arc::new(AppState { conversion, server }));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Backend running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("server: {e}")))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn convert_pdf(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let name = field.file_name().unwrap_or("upload.pdf").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((name, bytes));
                        break;
                    }
                    Err(e) => return error_response(e.status(), e.body_text()),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), e.body_text()),
        }
    }

    let Some((name, bytes)) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("No file uploaded (field name must be '{UPLOAD_FIELD}')"),
        );
    };
    info!("Received upload '{}' ({} bytes)", name, bytes.len());

    let resolved = match ResolvedInput::spool(&bytes, name, state.server.upload_dir.as_deref()) {
        Ok(r) => r,
        Err(e) => return pipeline_error(e),
    };

    let result = convert_with_input(&resolved, &state.conversion).await;
    drop(resolved);

    match result {
        Ok(output) => match serde_json::to_value(&output) {
            Ok(serde_json::Value::Object(mut body)) => {
                body.insert("success".into(), serde_json::Value::Bool(true));
                Json(serde_json::Value::Object(body)).into_response()
            }
            Ok(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "unexpected output shape".into(),
            ),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        Err(e) => pipeline_error(e),
    }
}

/// Body of `POST /api/download-docx`.
#[derive(Debug, Deserialize)]
pub struct DocxRequest {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answer_key: AnswerMap,
    #[serde(default)]
    pub export: ExportOptions,
}

async fn download_docx(Json(request): Json<DocxRequest>) -> Response {
    match export_docx(&request.questions, &request.answer_key, &request.export) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, DOCX_CONTENT_TYPE),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=questions.docx",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => pipeline_error(e),
    }
}

// ── Error mapping ────────────────────────────────────────────────────────

/// HTTP status for a pipeline failure.
pub fn status_for(err: &Pdf2QuizError) -> StatusCode {
    match err {
        Pdf2QuizError::NotAPdf { .. } | Pdf2QuizError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        Pdf2QuizError::ProcessingTimeout { .. } | Pdf2QuizError::RequestTimeout { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        Pdf2QuizError::RequestFailed { .. } => StatusCode::BAD_GATEWAY,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn pipeline_error(err: Pdf2QuizError) -> Response {
    let status = status_for(&err);
    warn!("Request failed ({}): {}", status, err);
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
