//! Signal analysis backend
//!
//! [`SignalBackend`] is the seam between the analysis services and the DSP
//! primitives they need. The analysis services only talk to the trait, so a
//! different backend (or a scripted test double) can be substituted without
//! touching the cascade, tracker or section logic.
//!
//! Whether the backend is usable is decided once at startup by
//! [`BackendAvailability::probe`] and passed to the analyzer.

use crate::dsp::{
    self, beat_tracker, chroma::ChromaFrame, onset, segmentation::SegmentationError, HOP_LENGTH,
    N_FFT,
};
use crate::utils::audio_decoder::{self, DecodeError, LoadedAudio};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Backend primitive errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Audio could not be loaded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Primitive called with unusable input (empty buffer, zero sample rate)
    #[error("Invalid backend input: {0}")]
    InvalidInput(String),

    /// Clustering could not produce the requested segments
    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Any other primitive failure
    #[error("Signal analysis failed: {0}")]
    Analysis(String),
}

/// Beat tracker output in frames
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    /// Tempo in BPM; zero or negative when no beat was found
    pub tempo: f64,
    /// Beat positions as frame indices
    pub beat_frames: Vec<usize>,
}

/// DSP primitives required by the analysis pipeline
///
/// All frame indices use the backend's own hop length; convert them with
/// [`SignalBackend::frames_to_time`].
pub trait SignalBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Decode a file to mono samples at `sample_rate`, optionally truncated
    fn load(
        &self,
        path: &Path,
        sample_rate: u32,
        duration_cap: Option<f64>,
    ) -> Result<LoadedAudio, BackendError>;

    /// Joint tempo and beat estimation
    fn beat_track(&self, samples: &[f32], sample_rate: u32) -> Result<BeatTrack, BackendError>;

    /// Aggregate tempo candidates in BPM (possibly empty)
    fn tempo(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>, BackendError>;

    /// Onset positions as frame indices
    fn onset_detect(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<usize>, BackendError>;

    /// Frame indices to seconds
    fn frames_to_time(&self, frames: &[usize], sample_rate: u32) -> Vec<f64>;

    /// 12-bin chroma per frame
    fn chroma(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<ChromaFrame>, BackendError>;

    /// First frame of each of `k` contiguous clusters of `features`
    fn segment_boundaries(
        &self,
        features: &[ChromaFrame],
        k: usize,
    ) -> Result<Vec<usize>, BackendError>;
}

fn check_input(samples: &[f32], sample_rate: u32) -> Result<(), BackendError> {
    if sample_rate == 0 {
        return Err(BackendError::InvalidInput("sample rate must be positive".into()));
    }
    if samples.is_empty() {
        return Err(BackendError::InvalidInput("empty audio buffer".into()));
    }
    Ok(())
}

/// Pure-Rust backend built on symphonia, rubato and rustfft
#[derive(Debug, Clone)]
pub struct NativeBackend {
    n_fft: usize,
    hop_length: usize,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self {
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
        }
    }
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn onset_envelope(&self, samples: &[f32]) -> Vec<f32> {
        onset::onset_strength(samples, self.n_fft, self.hop_length)
    }
}

impl SignalBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn load(
        &self,
        path: &Path,
        sample_rate: u32,
        duration_cap: Option<f64>,
    ) -> Result<LoadedAudio, BackendError> {
        Ok(audio_decoder::load_audio(path, sample_rate, duration_cap)?)
    }

    fn beat_track(&self, samples: &[f32], sample_rate: u32) -> Result<BeatTrack, BackendError> {
        check_input(samples, sample_rate)?;
        let envelope = self.onset_envelope(samples);
        let fps = dsp::frame_rate(sample_rate, self.hop_length);
        let output = beat_tracker::track_beats(&envelope, fps);

        debug!(
            tempo = output.tempo,
            beats = output.beats.len(),
            frames = envelope.len(),
            "Beat tracking complete"
        );

        Ok(BeatTrack {
            tempo: output.tempo,
            beat_frames: output.beats,
        })
    }

    fn tempo(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<f64>, BackendError> {
        check_input(samples, sample_rate)?;
        let envelope = self.onset_envelope(samples);
        let fps = dsp::frame_rate(sample_rate, self.hop_length);
        Ok(dsp::tempogram::estimate_tempo(&envelope, fps)
            .into_iter()
            .collect())
    }

    fn onset_detect(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<usize>, BackendError> {
        check_input(samples, sample_rate)?;
        let envelope = self.onset_envelope(samples);
        let fps = dsp::frame_rate(sample_rate, self.hop_length);
        Ok(onset::detect_onsets(&envelope, fps))
    }

    fn frames_to_time(&self, frames: &[usize], sample_rate: u32) -> Vec<f64> {
        if sample_rate == 0 {
            return Vec::new();
        }
        frames
            .iter()
            .map(|&f| dsp::frame_to_time(f, sample_rate, self.hop_length))
            .collect()
    }

    fn chroma(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<ChromaFrame>, BackendError> {
        check_input(samples, sample_rate)?;
        Ok(dsp::chroma::chroma_stft(
            samples,
            sample_rate,
            self.n_fft,
            self.hop_length,
        ))
    }

    fn segment_boundaries(
        &self,
        features: &[ChromaFrame],
        k: usize,
    ) -> Result<Vec<usize>, BackendError> {
        Ok(dsp::segmentation::agglomerative_boundaries(features, k)?)
    }
}

/// Whether the signal backend may be used for requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAvailability {
    Available,
    Unavailable,
}

impl BackendAvailability {
    /// Decide availability from configuration and a self-test
    ///
    /// The self-test runs tempo and onset detection on a short synthetic
    /// click track; any primitive error marks the backend unavailable.
    pub fn probe(backend: &dyn SignalBackend, enabled: bool) -> Self {
        if !enabled {
            info!(backend = backend.name(), "Signal backend disabled by configuration");
            return BackendAvailability::Unavailable;
        }

        let sample_rate = crate::models::ANALYSIS_SAMPLE_RATE;
        let probe_signal = self_test_signal(sample_rate);

        let result = backend
            .tempo(&probe_signal, sample_rate)
            .and_then(|_| backend.onset_detect(&probe_signal, sample_rate));

        match result {
            Ok(_) => {
                info!(backend = backend.name(), "Signal backend available");
                BackendAvailability::Available
            }
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    error = %e,
                    "Signal backend self-test failed, using file-size estimates only"
                );
                BackendAvailability::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BackendAvailability::Available)
    }
}

/// Two seconds of clicks at 120 BPM
fn self_test_signal(sample_rate: u32) -> Vec<f32> {
    let len = 2 * sample_rate as usize;
    let step = (sample_rate / 2) as usize;
    (0..len)
        .map(|i| if i % step < 64 { 0.8 } else { 0.0 })
        .collect()
}
