use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use console::{Emoji, style};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::cli::LlmProvider;
use crate::config::Config;
use crate::error::MetaError;
use crate::llm::ModelRegistry;
use crate::metadata::MetadataRecord;
use crate::parser::{DocumentType, declared_extension};
use crate::pipeline::Pipeline;

static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");
static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");

/// Shared state of the upload server
pub struct AppState {
    pipeline: Pipeline,
    permits: Semaphore,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractParams {
    #[serde(default)]
    include_text: bool,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl ExtractResponse {
    fn failure(message: impl Into<String>, stage: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            metadata: None,
            yaml: None,
            text: None,
            stage,
        }
    }
}

pub async fn run(
    host: Option<String>,
    port: Option<u16>,
    provider: Option<LlmProvider>,
    model: Option<String>,
) -> Result<()> {
    println!();
    println!("{}", style(" AutoMeta - Upload Server ").bold().reverse());
    println!();

    let config = Config::load_or_default()?;
    let provider = provider.unwrap_or_else(|| LlmProvider::from_config_name(&config.default_provider));

    let mut registry = ModelRegistry::new(provider, model, &config);
    let handles = registry
        .handles()
        .await
        .context("Failed to initialize models")?;
    println!("{}Models: {}", BRAIN, style(&handles.description).cyan());

    let state = Arc::new(AppState {
        pipeline: Pipeline::from_config(&config, &handles),
        permits: Semaphore::new(config.server.max_concurrent.max(1)),
    });
    drop(handles);

    let app = router(state, config.server.max_upload_bytes);

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!(
        "{}Listening on {}",
        GLOBE,
        style(format!("http://{}", addr)).blue().underlined()
    );
    println!(
        "{}Upload with: curl -F file=@report.pdf http://{}/api/extract",
        ROCKET, addr
    );
    println!();
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    registry.teardown();
    Ok(())
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/extract", post(extract))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/extract, multipart upload in field `file`
async fn extract(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExtractParams>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let request_id = uuid::Uuid::new_v4();

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ExtractResponse::failure(format!("Failed to read upload: {}", e), None)),
                        );
                    }
                }
                break;
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ExtractResponse::failure(format!("Invalid multipart body: {}", e), None)),
                );
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ExtractResponse::failure("Missing multipart field 'file'", None)),
        );
    };

    tracing::info!(%request_id, filename = %filename, bytes = bytes.len(), "Upload received");
    let (status, response) = process_upload(&state, &filename, &bytes, params.include_text).await;
    tracing::info!(%request_id, status = status.as_u16(), "Upload processed");

    (status, Json(response))
}

/// Store the upload in a scoped temporary file and run the pipeline on it
pub async fn process_upload(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
    include_text: bool,
) -> (StatusCode, ExtractResponse) {
    let extension = declared_extension(std::path::Path::new(filename));
    if DocumentType::from_extension(&extension) == DocumentType::Unknown {
        let err = MetaError::UnsupportedFileType(filename.to_string());
        return (status_for(&err), ExtractResponse::failure(err.to_string(), Some(err.stage())));
    }

    // Deleted when `upload` is dropped, on every return path
    let upload = match store_upload(&extension, bytes).await {
        Ok(file) => file,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ExtractResponse::failure(format!("{:#}", e), None),
            );
        }
    };

    let _permit = match state.permits.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                ExtractResponse::failure("Server is shutting down", None),
            );
        }
    };

    match state.pipeline.process_as(upload.path(), &extension).await {
        Ok(processed) => match processed.record.to_yaml() {
            Ok(yaml) => (
                StatusCode::OK,
                ExtractResponse {
                    success: true,
                    message: "Metadata generated successfully".to_string(),
                    metadata: Some(processed.record),
                    yaml: Some(yaml),
                    text: include_text.then_some(processed.text),
                    stage: None,
                },
            ),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ExtractResponse::failure(format!("{:#}", e), None),
            ),
        },
        Err(err) => {
            if err.is_warning() {
                tracing::warn!("{}: {}", filename, err);
            } else {
                tracing::error!("{}: {}", filename, err);
            }
            (status_for(&err), ExtractResponse::failure(err.to_string(), Some(err.stage())))
        }
    }
}

/// Write the upload to disk off the async runtime
async fn store_upload(extension: &str, bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
    let extension = extension.to_string();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || write_upload(&extension, &bytes))
        .await
        .context("Upload writer task failed")?
}

fn write_upload(extension: &str, bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("autometa-upload-")
        .suffix(&format!(".{}", extension))
        .tempfile()
        .context("Failed to create temporary upload file")?;
    file.write_all(bytes)
        .context("Failed to write temporary upload file")?;
    file.flush()?;
    Ok(file)
}

/// HTTP status for a document-level error
pub fn status_for(err: &MetaError) -> StatusCode {
    match err {
        MetaError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        MetaError::EmptyDocument | MetaError::ExtractionFailed { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MetaError::SummarizationFailed(_) | MetaError::KeywordExtractionFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
        MetaError::FileNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
