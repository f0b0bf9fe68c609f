//! Analysis result model
//!
//! An [`AnalysisResult`] has the same shape whether it came from the real
//! signal pipeline or from the file-size fallback. Results are built once per
//! request and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sample rate every recording is decoded to before analysis
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Quick mode only looks at the opening of the track
pub const QUICK_WINDOW_SECONDS: f64 = 30.0;

/// Tempo used when every estimation strategy fails
pub const DEFAULT_BPM: f64 = 120.0;

/// Only common time is supported
pub const TIME_SIGNATURE: &str = "4/4";

/// Quality/latency trade-off requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// First 30 seconds, tempo and beats only
    #[default]
    Quick,
    /// Whole track, plus tempo drift and sections
    Full,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Quick => "quick",
            AnalysisMode::Full => "full",
        }
    }

    /// Decode limit in seconds, if the mode truncates its input
    pub fn duration_cap(&self) -> Option<f64> {
        match self {
            AnalysisMode::Quick => Some(QUICK_WINDOW_SECONDS),
            AnalysisMode::Full => None,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode string that is neither "quick" nor "full"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid mode '{0}'. Must be 'quick' or 'full'")]
pub struct InvalidMode(pub String);

impl FromStr for AnalysisMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(AnalysisMode::Quick),
            "full" => Ok(AnalysisMode::Full),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}

/// Which tempo strategy produced a BPM value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoSource {
    BeatTracking,
    AggregateTempo,
    OnsetInterval,
    Default,
}

impl TempoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TempoSource::BeatTracking => "beat_tracking",
            TempoSource::AggregateTempo => "aggregate_tempo",
            TempoSource::OnsetInterval => "onset_interval",
            TempoSource::Default => "default",
        }
    }
}

/// Tempo plus beat timestamps for one analysis window
///
/// `beats` is strictly increasing and never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    pub bpm: f64,
    pub beats: Vec<f64>,
    pub source: TempoSource,
}

/// Local tempo measured over one 10 second window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Window start in seconds
    pub time: f64,
    pub bpm: f64,
}

/// Contiguous structural section of the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub start: f64,
    pub end: f64,
    pub index: usize,
}

/// Response body of `POST /music/analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub bpm: f64,
    pub beats: Vec<f64>,
    pub time_signature: String,
    pub duration: Option<f64>,
    pub sections: Option<Vec<Section>>,
    pub tempo_changes: Option<Vec<TempoChange>>,
    pub mode: AnalysisMode,
}

impl AnalysisResult {
    /// Result carrying only a beat grid; full-mode extras are added by the caller
    pub fn from_grid(grid: BeatGrid, duration: Option<f64>, mode: AnalysisMode) -> Self {
        Self {
            bpm: grid.bpm,
            beats: grid.beats,
            time_signature: TIME_SIGNATURE.to_string(),
            duration,
            sections: None,
            tempo_changes: None,
            mode,
        }
    }
}
