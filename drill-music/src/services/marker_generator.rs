//! Count marker generation
//!
//! Places a marker every `interval` beats, starting at 0 s and stopping
//! before the end of the track (or [`UNKNOWN_DURATION_SECONDS`] when the
//! duration is unknown).

use crate::models::{AnalysisResult, Marker, MarkerResponse, UNKNOWN_DURATION_SECONDS};
use thiserror::Error;

/// Marker generation errors
#[derive(Debug, Error, PartialEq)]
pub enum MarkerError {
    #[error("Interval must be a positive number of beats, got {0}")]
    InvalidInterval(f64),

    #[error("Analysis tempo must be positive, got {0}")]
    InvalidTempo(f64),
}

/// Check a marker interval before any work is done
pub fn validate_interval(interval: f64) -> Result<f64, MarkerError> {
    if interval.is_finite() && interval > 0.0 {
        Ok(interval)
    } else {
        Err(MarkerError::InvalidInterval(interval))
    }
}

/// Markers every `interval` beats across the analyzed track
pub fn generate_markers(result: &AnalysisResult, interval: f64) -> Result<MarkerResponse, MarkerError> {
    let interval = validate_interval(interval)?;
    let bpm = result.bpm;
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(MarkerError::InvalidTempo(bpm));
    }

    let step = interval * 60.0 / bpm;
    let horizon = result.duration.unwrap_or(UNKNOWN_DURATION_SECONDS);

    let mut markers = Vec::new();
    let mut i = 0usize;
    loop {
        let time = i as f64 * step;
        if !(time < horizon) {
            break;
        }
        markers.push(Marker {
            time,
            count: i as f64 * interval,
            bpm,
        });
        i += 1;
    }

    Ok(MarkerResponse {
        bpm,
        total_markers: markers.len(),
        markers,
    })
}
