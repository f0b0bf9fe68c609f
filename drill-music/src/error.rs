//! Error types for drill-music
//!
//! [`AnalysisError`] covers the analysis pipeline and controller;
//! [`ApiError`] is what HTTP handlers return.

use crate::services::backend::BackendError;
use axum::{
    extract::{multipart::MultipartRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline and controller errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A backend primitive failed (including audio decoding)
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Upload could not be inspected
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stage called with unusable parameters
    #[error("Invalid analysis input: {0}")]
    InvalidInput(String),

    /// Pipeline thread panicked
    #[error("Analysis task failed: {0}")]
    Panicked(String),

    /// Pipeline run was abandoned by its caller
    #[error("Analysis cancelled")]
    Cancelled,

    /// Pipeline exceeded the configured timeout
    #[error("Analysis timed out after {0:.1} seconds")]
    TimedOut(f64),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload is not a readable audio file (400)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Audio stream could not be decoded (400)
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Analysis failed for another reason (400)
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Map an analysis failure that escaped the controller to a client error
    ///
    /// Classification follows the error text: missing/unidentifiable files
    /// are unsupported formats, codec and decode problems are decode
    /// failures, anything else is a generic analysis failure.
    pub fn from_analysis_failure(filename: &str, error: &AnalysisError) -> Self {
        let text = error.to_string();
        let lower = text.to_lowercase();

        if text.contains("No such file")
            || lower.contains("cannot identify")
            || lower.contains("unsupported")
        {
            ApiError::UnsupportedFormat(format!(
                "Unsupported audio format for '{}'. Please upload MP3, WAV, M4A, FLAC or OGG",
                filename
            ))
        } else if lower.contains("codec") || lower.contains("decode") {
            ApiError::DecodeFailed(format!(
                "Failed to decode '{}': {}. Try converting the file to WAV or MP3",
                filename, text
            ))
        } else {
            ApiError::AnalysisFailed(format!("Analysis of '{}' failed: {}", filename, text))
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::UnsupportedFormat(msg) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", msg)
            }
            ApiError::DecodeFailed(msg) => (StatusCode::BAD_REQUEST, "DECODE_FAILED", msg),
            ApiError::AnalysisFailed(msg) => (StatusCode::BAD_REQUEST, "ANALYSIS_FAILED", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
