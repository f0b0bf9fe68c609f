//! Degradation controller
//!
//! [`MusicAnalyzer`] decides, per request, whether the real pipeline or the
//! file-size fallback answers:
//!
//! | Backend     | Pipeline outcome            | Result             |
//! |-------------|-----------------------------|--------------------|
//! | unavailable | not run                     | fallback           |
//! | available   | success                     | pipeline result    |
//! | available   | error, panic or timeout     | fallback (warned)  |
//!
//! The pipeline runs on the blocking thread pool under a timeout. Partial
//! output of a failed run is never returned, and an abandoned run is
//! cancelled so it stops at its next stage or tempo window.

use crate::error::AnalysisError;
use crate::models::{AnalysisMode, AnalysisResult};
use crate::services::analysis_pipeline::run_pipeline;
use crate::services::backend::{BackendAvailability, SignalBackend};
use crate::services::fallback_estimator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default upper bound on one pipeline run
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

/// Analysis entry point shared by all request handlers
pub struct MusicAnalyzer {
    backend: Arc<dyn SignalBackend>,
    availability: BackendAvailability,
    timeout: Duration,
}

impl MusicAnalyzer {
    /// Create analyzer
    ///
    /// # Arguments
    /// * `backend` - Signal primitives used by the pipeline
    /// * `availability` - Result of the startup probe
    /// * `timeout` - Upper bound on one pipeline run
    pub fn new(
        backend: Arc<dyn SignalBackend>,
        availability: BackendAvailability,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            availability,
            timeout,
        }
    }

    pub fn availability(&self) -> BackendAvailability {
        self.availability
    }

    /// Analyze the file at `path`, degrading to the fallback estimator
    ///
    /// # Errors
    /// Only when the fallback itself cannot run (the file size cannot be read).
    pub async fn analyze_file(
        &self,
        path: &Path,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, AnalysisError> {
        if !self.availability.is_available() {
            info!(path = %path.display(), mode = %mode, "Backend unavailable, using file-size estimate");
            return fallback_estimator::estimate_from_file(path, mode);
        }

        let failure = match self.run_guarded(path, mode).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        warn!(
            path = %path.display(),
            mode = %mode,
            error = %failure,
            "Analysis pipeline failed, using file-size estimate"
        );
        fallback_estimator::estimate_from_file(path, mode)
    }

    /// Run the pipeline on the blocking pool with panic and timeout capture
    ///
    /// The run is cancelled when this future completes or is dropped, so a
    /// timed-out or disconnected request does not keep a blocking thread busy.
    async fn run_guarded(
        &self,
        path: &Path,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, AnalysisError> {
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let backend = Arc::clone(&self.backend);
        let owned_path = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            run_pipeline(backend.as_ref(), &owned_path, mode, &cancel)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(AnalysisError::Panicked(join_error.to_string())),
            Err(_) => Err(AnalysisError::TimedOut(self.timeout.as_secs_f64())),
        }
    }
}
