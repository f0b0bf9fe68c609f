//! Music analysis and marker endpoints
//!
//! Both endpoints take a multipart upload with a `file` field. Request
//! parameters are validated before the upload is written to disk; the
//! temporary copy lives only for the duration of the request.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection,
        Multipart, Query, State,
    },
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisMode, AnalysisResult, MarkerResponse, DEFAULT_MARKER_INTERVAL};
use crate::services::{generate_markers, validate_interval};
use crate::AppState;

/// Multipart form fields of an upload request
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    mode: Option<String>,
}

#[derive(Debug)]
struct UploadedFile {
    filename: Option<String>,
    bytes: Bytes,
}

/// Query parameters of `POST /music/markers`
#[derive(Debug, Deserialize)]
pub struct MarkerQuery {
    /// Beats between markers (default 4)
    pub interval: Option<f64>,
}

/// Collect the `file` and `mode` fields; other fields are ignored
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                form.file = Some(UploadedFile { filename, bytes });
            }
            Some("mode") => {
                let mode = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read mode: {}", e)))?;
                form.mode = Some(mode);
            }
            other => {
                debug!(field = ?other, "Ignoring multipart field");
            }
        }
    }

    Ok(form)
}

fn parse_mode(mode: Option<&str>) -> ApiResult<AnalysisMode> {
    match mode {
        None => Ok(AnalysisMode::default()),
        Some(value) => value
            .parse()
            .map_err(|e: crate::models::InvalidMode| ApiError::BadRequest(e.to_string())),
    }
}

/// Filename and contents of a usable upload
fn require_file(file: Option<UploadedFile>) -> ApiResult<(String, Bytes)> {
    let file = file.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let filename = file
        .filename
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No filename provided".to_string()))?;

    if file.bytes.is_empty() {
        return Err(ApiError::BadRequest(format!("Uploaded file '{}' is empty", filename)));
    }

    Ok((filename, file.bytes))
}

/// Write the upload to a temporary file keeping its extension as a format hint
fn persist_upload(filename: &str, bytes: &[u8]) -> ApiResult<NamedTempFile> {
    let suffix = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("drill-upload-")
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    Ok(file)
}

/// POST /music/analyze
///
/// Multipart fields: `file` (required), `mode` ("quick" or "full", default
/// "quick").
pub async fn analyze_music(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisResult>> {
    let form = read_upload(multipart?).await?;
    let mode = parse_mode(form.mode.as_deref())?;
    let (filename, bytes) = require_file(form.file)?;

    info!(filename = %filename, mode = %mode, bytes = bytes.len(), "Analyzing upload");

    let upload = persist_upload(&filename, &bytes)?;
    let result = state
        .analyzer
        .analyze_file(upload.path(), mode)
        .await
        .map_err(|e| ApiError::from_analysis_failure(&filename, &e))?;

    Ok(Json(result))
}

/// POST /music/markers?interval=4
///
/// Runs a quick analysis and returns count markers every `interval` beats.
pub async fn generate_music_markers(
    State(state): State<AppState>,
    query: Result<Query<MarkerQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<MarkerResponse>> {
    let Query(query) = query?;
    let interval = validate_interval(query.interval.unwrap_or(DEFAULT_MARKER_INTERVAL))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let form = read_upload(multipart?).await?;
    let (filename, bytes) = require_file(form.file)?;

    info!(filename = %filename, interval = interval, bytes = bytes.len(), "Generating markers");

    let upload = persist_upload(&filename, &bytes)?;
    let result = state
        .analyzer
        .analyze_file(upload.path(), AnalysisMode::Quick)
        .await
        .map_err(|e| ApiError::from_analysis_failure(&filename, &e))?;

    let response = generate_markers(&result, interval)
        .map_err(|e| ApiError::AnalysisFailed(e.to_string()))?;

    Ok(Json(response))
}

/// Build music analysis routes
pub fn music_routes() -> Router<AppState> {
    Router::new()
        .route("/music/analyze", post(analyze_music))
        .route("/music/markers", post(generate_music_markers))
}
