//! Data models for drill-music

pub mod analysis;
pub mod markers;

pub use analysis::{
    AnalysisMode, AnalysisResult, BeatGrid, InvalidMode, Section, TempoChange, TempoSource,
    ANALYSIS_SAMPLE_RATE, DEFAULT_BPM, QUICK_WINDOW_SECONDS, TIME_SIGNATURE,
};
pub use markers::{Marker, MarkerResponse, DEFAULT_MARKER_INTERVAL, UNKNOWN_DURATION_SECONDS};
