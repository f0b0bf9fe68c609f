//! drill-music - Music Analysis Service
//!
//! Estimates tempo, beats, tempo drift and sections of uploaded recordings
//! for the drill formation editor, and derives count markers from them.

use anyhow::{Context, Result};
use clap::Parser;
use drill_common::config::{load_toml_config, resolve_config_path};
use drill_music::config::{CliOverrides, ServiceConfig, TomlConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use drill_music::services::{BackendAvailability, MusicAnalyzer, NativeBackend, SignalBackend};
use drill_music::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "drill-music")]
#[command(about = "Music analysis service for drill formation editing")]
#[command(version)]
struct Args {
    /// Path to drill-music.toml
    #[arg(short, long, env = "DRILL_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "DRILL_MUSIC_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DRILL_MUSIC_PORT")]
    port: Option<u16>,

    /// Default log filter (RUST_LOG takes precedence)
    #[arg(long, env = "DRILL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Answer every request from the file-size estimate
    #[arg(long, env = "DRILL_DISABLE_BACKEND")]
    disable_backend: bool,

    /// Upper bound on one analysis run, in seconds
    #[arg(long, env = "DRILL_ANALYSIS_TIMEOUT")]
    timeout_seconds: Option<u64>,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "DRILL_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            disable_backend: self.disable_backend,
            timeout_seconds: self.timeout_seconds,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration is read before logging so the TOML log level applies;
    // its outcome is reported below once the subscriber is installed
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let toml_config: TomlConfig =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;
    let config = ServiceConfig::resolve(&args.overrides(), toml_config);

    let directive = format!("drill_music={0},drill_common={0},tower_http={0}", config.log_level);
    drill_common::logging::init_tracing(&directive).context("Failed to initialize logging")?;

    info!("Starting drill-music (Music Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!(path = %path.display(), "Configuration loaded"),
        Some(path) => warn!(
            path = %path.display(),
            "Configuration file not found, using built-in defaults"
        ),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    let backend: Arc<dyn SignalBackend> = Arc::new(NativeBackend::new());
    let availability = BackendAvailability::probe(backend.as_ref(), config.backend_enabled);

    let analyzer = MusicAnalyzer::new(backend, availability, config.analysis_timeout);
    let state = AppState::new(analyzer, config.max_upload_bytes);
    let app = drill_music::build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("drill-music stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
