//! Analysis services
//!
//! Leaf-first: [`backend`] provides signal primitives; the tempo cascade,
//! windowed tracker and section detector build on it; [`analysis_pipeline`]
//! composes them and [`music_analyzer`] wraps the pipeline with the
//! file-size fallback.

pub mod analysis_pipeline;
pub mod backend;
pub mod fallback_estimator;
pub mod marker_generator;
pub mod music_analyzer;
pub mod section_detector;
pub mod tempo_cascade;
pub mod tempo_tracker;

pub use backend::{BackendAvailability, BackendError, BeatTrack, NativeBackend, SignalBackend};
pub use marker_generator::{generate_markers, validate_interval, MarkerError};
pub use music_analyzer::{MusicAnalyzer, DEFAULT_ANALYSIS_TIMEOUT};
pub use tempo_cascade::{StrategyFailure, TempoEstimate, TempoStrategy, TEMPO_STRATEGIES};
