//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Capabilities advertised by the health endpoint
pub const FEATURES: &[&str] = &["music-analysis", "music-markers"];

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status, always "ok" while the process answers
    pub status: String,
    /// Service name ("drill-music")
    pub service: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Whether requests use the signal backend or the file-size estimate
    pub backend_available: bool,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub features: Vec<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        service: "drill-music".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend_available: state.analyzer.availability().is_available(),
        uptime_seconds,
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
