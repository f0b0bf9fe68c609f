//! Audio Test Fixture Generator
//!
//! Utilities for generating WAV files with known rhythmic content

use std::path::{Path, PathBuf};

/// Content of a generated file
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestSignal {
    /// Digital silence
    Silence,
    /// Continuous sine tone
    Tone { frequency: f32 },
    /// Short decaying noise bursts at a fixed tempo
    Clicks { bpm: f32 },
}

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub signal: TestSignal,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 10.0,
            sample_rate: 22_050,
            channels: 1,
            signal: TestSignal::Silence,
        }
    }
}

fn sample_at(signal: TestSignal, i: usize, sample_rate: u32) -> f32 {
    match signal {
        TestSignal::Silence => 0.0,
        TestSignal::Tone { frequency } => {
            let t = i as f32 / sample_rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        }
        TestSignal::Clicks { bpm } => {
            let period = (60.0 / bpm * sample_rate as f32) as usize;
            let offset = i % period.max(1);
            let click_len = (sample_rate / 100) as usize;
            if offset < click_len {
                // Deterministic pseudo-noise, linearly decaying
                let noise = ((i as u32).wrapping_mul(1_103_515_245).wrapping_add(12_345) >> 16) as f32
                    / 32_768.0
                    - 1.0;
                0.8 * noise * (1.0 - offset as f32 / click_len as f32)
            } else {
                0.0
            }
        }
    }
}

/// Generate a 16-bit PCM WAV file
///
/// # Arguments
/// * `path` - Output file path
/// * `config` - Audio configuration
///
/// # Returns
/// Generated file path
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        let value = sample_at(config.signal, i, config.sample_rate);
        let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Write `len` arbitrary bytes, for size-based estimates
pub fn write_bytes_file(path: &Path, len: usize) -> anyhow::Result<PathBuf> {
    let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(path, bytes)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_silence_wav() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("silence.wav");

        generate_test_wav(&wav_path, &AudioConfig::default()).unwrap();

        let reader = hound::WavReader::open(&wav_path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert_eq!(reader.duration(), 220_500);
    }

    #[test]
    fn test_click_signal_has_gaps() {
        let at_click = sample_at(TestSignal::Clicks { bpm: 120.0 }, 11_025 + 10, 22_050);
        let between = sample_at(TestSignal::Clicks { bpm: 120.0 }, 11_025 + 5_000, 22_050);
        assert_ne!(at_click, 0.0);
        assert_eq!(between, 0.0);
    }
}
