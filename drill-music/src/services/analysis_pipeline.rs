//! Signal analysis pipeline
//!
//! Synchronous, single-request pipeline: load → tempo cascade, and in full
//! mode additionally the windowed tempo tracker and section detector.
//! Optional full-mode stages degrade to `None` on failure; only a load
//! failure fails the pipeline as a whole. The run stops between stages once
//! its cancellation token fires.

use crate::error::AnalysisError;
use crate::models::{AnalysisMode, AnalysisResult, ANALYSIS_SAMPLE_RATE};
use crate::services::backend::SignalBackend;
use crate::services::section_detector::detect_sections;
use crate::services::tempo_cascade::estimate_beat_grid;
use crate::services::tempo_tracker::track_tempo_changes;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

fn ensure_active(cancel: &CancellationToken, stage: &str) -> Result<(), AnalysisError> {
    if cancel.is_cancelled() {
        debug!(stage, "Analysis cancelled");
        return Err(AnalysisError::Cancelled);
    }
    Ok(())
}

/// Analyze the audio file at `path`
///
/// # Arguments
/// * `backend` - Signal primitives
/// * `path` - Audio file on disk
/// * `mode` - Quick (first 30 s) or full analysis
/// * `cancel` - Checked between stages and between tempo windows
///
/// # Returns
/// * Quick mode: `duration` is the length of the whole file, beats cover
///   the first 30 s, `sections` and `tempo_changes` are `None`
/// * Full mode: `duration` is the decoded length; `sections` and
///   `tempo_changes` are `None` only if their stage failed
///
/// # Errors
/// * [`AnalysisError::Backend`] - audio could not be loaded
/// * [`AnalysisError::Cancelled`] - `cancel` fired before the run finished
pub fn run_pipeline(
    backend: &dyn SignalBackend,
    path: &Path,
    mode: AnalysisMode,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, AnalysisError> {
    ensure_active(cancel, "load")?;
    let audio = backend.load(path, ANALYSIS_SAMPLE_RATE, mode.duration_cap())?;
    ensure_active(cancel, "tempo")?;
    let sample_rate = audio.sample_rate;
    let buffer_duration = audio.buffer_duration();

    let grid = estimate_beat_grid(backend, &audio.samples, sample_rate, buffer_duration);
    debug!(
        bpm = grid.bpm,
        beats = grid.beats.len(),
        source = grid.source.as_str(),
        "Beat grid estimated"
    );

    let result = match mode {
        AnalysisMode::Quick => {
            AnalysisResult::from_grid(grid, Some(audio.total_duration), mode)
        }
        AnalysisMode::Full => {
            let global_bpm = grid.bpm;
            let mut result = AnalysisResult::from_grid(grid, Some(buffer_duration), mode);

            result.tempo_changes = match track_tempo_changes(
                backend,
                &audio.samples,
                sample_rate,
                buffer_duration,
                global_bpm,
                cancel,
            ) {
                Ok(changes) => Some(changes),
                Err(AnalysisError::Cancelled) => return Err(AnalysisError::Cancelled),
                Err(e) => {
                    debug!(error = %e, "Tempo tracking failed");
                    None
                }
            };

            ensure_active(cancel, "sections")?;
            result.sections =
                match detect_sections(backend, &audio.samples, sample_rate, buffer_duration) {
                    Ok(sections) => Some(sections),
                    Err(e) => {
                        debug!(error = %e, "Section detection failed");
                        None
                    }
                };

            result
        }
    };

    info!(
        path = %path.display(),
        mode = %mode,
        bpm = result.bpm,
        beats = result.beats.len(),
        duration = ?result.duration,
        "Analysis pipeline complete"
    );

    Ok(result)
}
