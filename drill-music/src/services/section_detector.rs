//! Section boundary detector
//!
//! Splits the track into [`SECTION_COUNT`] contiguous sections by clustering
//! chroma frames. Section `i` spans `[boundary[i], boundary[i + 1])` and the
//! last section ends at the track duration.

use crate::error::AnalysisError;
use crate::models::Section;
use crate::services::backend::SignalBackend;
use tracing::debug;

/// Number of sections produced for every track
pub const SECTION_COUNT: usize = 5;

/// Detect structural sections over the whole buffer
///
/// # Errors
/// Any backend failure, including a track too short to yield
/// [`SECTION_COUNT`] chroma frames.
pub fn detect_sections(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
    duration: f64,
) -> Result<Vec<Section>, AnalysisError> {
    let chroma = backend.chroma(samples, sample_rate)?;
    let boundary_frames = backend.segment_boundaries(&chroma, SECTION_COUNT)?;
    let starts = backend.frames_to_time(&boundary_frames, sample_rate);

    let sections: Vec<Section> = starts
        .iter()
        .enumerate()
        .map(|(index, &start)| Section {
            start,
            end: starts.get(index + 1).copied().unwrap_or(duration),
            index,
        })
        .collect();

    debug!(
        frames = chroma.len(),
        sections = sections.len(),
        "Section detection complete"
    );

    Ok(sections)
}
