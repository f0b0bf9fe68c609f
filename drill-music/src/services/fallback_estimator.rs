//! Synthetic fallback estimator
//!
//! Produces a plausible result from the upload size alone, assuming roughly
//! one minute of audio per MiB and a steady 120 BPM. Used when the signal
//! backend is unavailable or the real pipeline fails.

use crate::error::AnalysisError;
use crate::models::{AnalysisMode, AnalysisResult, DEFAULT_BPM, QUICK_WINDOW_SECONDS, TIME_SIGNATURE};
use std::path::Path;

/// Bytes assumed per minute of audio
pub const FALLBACK_BYTES_PER_MINUTE: f64 = 1_048_576.0;

/// Spacing of synthetic beats (120 BPM)
pub const FALLBACK_BEAT_SPACING: f64 = 0.5;

/// Fallback result for an upload of `bytes` bytes
pub fn estimate_from_size(bytes: u64, mode: AnalysisMode) -> AnalysisResult {
    let estimated_duration = bytes as f64 / FALLBACK_BYTES_PER_MINUTE * 60.0;

    let mut max_beats = (estimated_duration / FALLBACK_BEAT_SPACING).floor() as usize + 1;
    if mode == AnalysisMode::Quick {
        let quick_cap = (QUICK_WINDOW_SECONDS / FALLBACK_BEAT_SPACING).floor() as usize + 1;
        max_beats = max_beats.min(quick_cap);
    }

    let beats = (0..max_beats)
        .map(|i| i as f64 * FALLBACK_BEAT_SPACING)
        .collect();

    let tempo_changes = match mode {
        AnalysisMode::Quick => None,
        AnalysisMode::Full => Some(Vec::new()),
    };

    AnalysisResult {
        bpm: DEFAULT_BPM,
        beats,
        time_signature: TIME_SIGNATURE.to_string(),
        duration: Some(estimated_duration),
        sections: None,
        tempo_changes,
        mode,
    }
}

/// Fallback result for the file at `path`
///
/// # Errors
/// * [`AnalysisError::Io`] - file size cannot be read
pub fn estimate_from_file(path: &Path, mode: AnalysisMode) -> Result<AnalysisResult, AnalysisError> {
    let metadata = std::fs::metadata(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(estimate_from_size(metadata.len(), mode))
}
