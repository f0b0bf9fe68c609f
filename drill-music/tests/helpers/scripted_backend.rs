//! Scripted signal backend
//!
//! Test double whose primitives return canned values (or errors) and record
//! every call, used to drive the tempo cascade and degradation controller
//! through specific paths.

use drill_music::dsp::chroma::ChromaFrame;
use drill_music::services::{BackendError, BeatTrack, SignalBackend};
use drill_music::utils::{DecodeError, LoadedAudio};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const HOP: usize = 512;

/// Backend with canned responses; `None` makes the primitive fail
pub struct ScriptedBackend {
    pub audio: Option<LoadedAudio>,
    pub beat_track: Option<BeatTrack>,
    pub tempo: Option<Vec<f64>>,
    pub onsets: Option<Vec<usize>>,
    pub boundaries: Option<Vec<usize>>,
    pub panic_on_load: bool,
    pub load_delay: Option<Duration>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    /// Every primitive fails; loading yields `seconds` of silence at 22.05 kHz
    pub fn failing(seconds: f64) -> Self {
        Self {
            audio: Some(silent_audio(seconds)),
            beat_track: None,
            tempo: None,
            onsets: None,
            boundaries: None,
            panic_on_load: false,
            load_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Primitive names in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn scripted<T: Clone>(&self, value: &Option<T>, name: &str) -> Result<T, BackendError> {
        value
            .clone()
            .ok_or_else(|| BackendError::Analysis(format!("scripted {name} failure")))
    }
}

/// Silent buffer with matching total duration
pub fn silent_audio(seconds: f64) -> LoadedAudio {
    LoadedAudio {
        samples: vec![0.0; (seconds * 22_050.0) as usize],
        sample_rate: 22_050,
        total_duration: seconds,
    }
}

impl SignalBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(
        &self,
        path: &Path,
        _sample_rate: u32,
        duration_cap: Option<f64>,
    ) -> Result<LoadedAudio, BackendError> {
        self.record("load");
        if let Some(delay) = self.load_delay {
            std::thread::sleep(delay);
        }
        if self.panic_on_load {
            panic!("scripted panic while loading {}", path.display());
        }

        let mut audio = self
            .audio
            .clone()
            .ok_or_else(|| DecodeError::Decode("scripted decode failure".into()))?;
        if let Some(cap) = duration_cap {
            let max_len = (cap * audio.sample_rate as f64) as usize;
            audio.samples.truncate(max_len);
        }
        Ok(audio)
    }

    fn beat_track(&self, _samples: &[f32], _sample_rate: u32) -> Result<BeatTrack, BackendError> {
        self.record("beat_track");
        self.scripted(&self.beat_track, "beat_track")
    }

    fn tempo(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<f64>, BackendError> {
        self.record("tempo");
        self.scripted(&self.tempo, "tempo")
    }

    fn onset_detect(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<usize>, BackendError> {
        self.record("onset_detect");
        self.scripted(&self.onsets, "onset_detect")
    }

    fn frames_to_time(&self, frames: &[usize], sample_rate: u32) -> Vec<f64> {
        frames
            .iter()
            .map(|&f| (f * HOP) as f64 / sample_rate as f64)
            .collect()
    }

    fn chroma(&self, samples: &[f32], _sample_rate: u32) -> Result<Vec<ChromaFrame>, BackendError> {
        self.record("chroma");
        Ok(vec![[0.0; 12]; samples.len() / HOP + 1])
    }

    fn segment_boundaries(
        &self,
        _features: &[ChromaFrame],
        _k: usize,
    ) -> Result<Vec<usize>, BackendError> {
        self.record("segment_boundaries");
        self.scripted(&self.boundaries, "segment_boundaries")
    }
}
