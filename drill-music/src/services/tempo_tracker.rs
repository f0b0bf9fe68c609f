//! Windowed tempo tracker
//!
//! Re-estimates tempo over overlapping windows of the full track to expose
//! tempo drift. Window `k` starts at exactly `k * TEMPO_HOP_SECONDS`;
//! windows keep starting while the start is before the end of the track, so
//! the last ones may be shorter than [`TEMPO_WINDOW_SECONDS`].
//! The cancellation token is checked before every window.

use crate::error::AnalysisError;
use crate::models::TempoChange;
use crate::services::backend::{BackendError, SignalBackend};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Width of each tempo window
pub const TEMPO_WINDOW_SECONDS: f64 = 10.0;

/// Distance between window starts
pub const TEMPO_HOP_SECONDS: f64 = 5.0;

/// Tempo of one window: beat tracker, then aggregate tempo, then `fallback_bpm`
fn window_bpm(
    backend: &dyn SignalBackend,
    segment: &[f32],
    sample_rate: u32,
    fallback_bpm: f64,
) -> Result<f64, BackendError> {
    let tracked = backend.beat_track(segment, sample_rate)?.tempo;
    if tracked > 0.0 {
        return Ok(tracked);
    }

    let aggregate = backend
        .tempo(segment, sample_rate)?
        .first()
        .copied()
        .unwrap_or(0.0);
    if aggregate > 0.0 {
        return Ok(aggregate);
    }

    Ok(fallback_bpm)
}

/// Per-window tempo samples over the whole buffer
///
/// Windows whose primitives fail, or that contain no samples, are skipped.
///
/// # Errors
/// * [`AnalysisError::InvalidInput`] - zero sample rate or non-finite duration
/// * [`AnalysisError::Cancelled`] - `cancel` fired between windows
pub fn track_tempo_changes(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
    duration: f64,
    fallback_bpm: f64,
    cancel: &CancellationToken,
) -> Result<Vec<TempoChange>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "tempo tracking needs a positive sample rate".into(),
        ));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "tempo tracking needs a finite duration, got {duration}"
        )));
    }

    let rate = sample_rate as f64;
    let mut changes = Vec::new();
    let mut k = 0usize;

    loop {
        let start = k as f64 * TEMPO_HOP_SECONDS;
        if !(start < duration) {
            break;
        }
        if cancel.is_cancelled() {
            debug!(window_start = start, "Tempo tracking cancelled");
            return Err(AnalysisError::Cancelled);
        }
        k += 1;

        let start_idx = ((start * rate).round() as usize).min(samples.len());
        let end_idx = (((start + TEMPO_WINDOW_SECONDS) * rate).round() as usize).min(samples.len());
        if start_idx >= end_idx {
            debug!(window_start = start, "Skipping empty tempo window");
            continue;
        }

        match window_bpm(backend, &samples[start_idx..end_idx], sample_rate, fallback_bpm) {
            Ok(bpm) => changes.push(TempoChange { time: start, bpm }),
            Err(e) => {
                debug!(window_start = start, error = %e, "Skipping tempo window");
            }
        }
    }

    debug!(windows = k, samples = changes.len(), "Tempo tracking complete");
    Ok(changes)
}
