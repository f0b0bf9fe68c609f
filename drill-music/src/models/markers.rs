//! Count markers derived from an analysis result

use serde::{Deserialize, Serialize};

/// Beats between markers when the client does not specify one
pub const DEFAULT_MARKER_INTERVAL: f64 = 4.0;

/// Marker horizon used when the analysis has no duration
pub const UNKNOWN_DURATION_SECONDS: f64 = 300.0;

/// One count marker on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub time: f64,
    /// Beat count at this marker (0, interval, 2 * interval, ...)
    pub count: f64,
    pub bpm: f64,
}

/// Response body of `POST /music/markers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerResponse {
    pub bpm: f64,
    pub markers: Vec<Marker>,
    pub total_markers: usize,
}
