//! drill-music library interface
//!
//! Exposes the analysis services and the HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod dsp;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use services::MusicAnalyzer;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Degradation controller fronting the analysis pipeline
    pub analyzer: Arc<MusicAnalyzer>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(analyzer: MusicAnalyzer, max_upload_bytes: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            startup_time: Utc::now(),
            max_upload_bytes,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::music_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
