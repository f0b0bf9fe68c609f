//! Chroma (pitch class profile) features

use super::stft::magnitude_spectrogram;

/// Pitch classes per chroma frame, starting at C
pub const N_CHROMA: usize = 12;

/// Lowest frequency folded into the chroma (A0)
const MIN_FREQUENCY: f64 = 27.5;

/// One 12-bin chroma vector per frame
pub type ChromaFrame = [f32; N_CHROMA];

/// Chromagram of a mono signal
///
/// Spectral power of every FFT bin between A0 and Nyquist is added to the
/// pitch class of its nearest equal-tempered note. Each frame is then scaled
/// so its largest bin is 1.0; silent frames stay zero.
pub fn chroma_stft(samples: &[f32], sample_rate: u32, n_fft: usize, hop: usize) -> Vec<ChromaFrame> {
    let spectrogram = magnitude_spectrogram(samples, n_fft, hop);
    let pitch_classes = bin_pitch_classes(sample_rate, n_fft);

    spectrogram
        .iter()
        .map(|frame| {
            let mut chroma = [0.0f32; N_CHROMA];
            for (magnitude, class) in frame.iter().zip(pitch_classes.iter()) {
                if let Some(class) = class {
                    chroma[*class] += magnitude * magnitude;
                }
            }

            let peak = chroma.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                for value in chroma.iter_mut() {
                    *value /= peak;
                }
            }
            chroma
        })
        .collect()
}

/// Pitch class of each FFT bin, `None` below [`MIN_FREQUENCY`]
fn bin_pitch_classes(sample_rate: u32, n_fft: usize) -> Vec<Option<usize>> {
    (0..=n_fft / 2)
        .map(|bin| {
            let freq = bin as f64 * sample_rate as f64 / n_fft as f64;
            if freq < MIN_FREQUENCY {
                return None;
            }
            let midi = 69.0 + 12.0 * (freq / 440.0).log2();
            Some((midi.round() as i64).rem_euclid(N_CHROMA as i64) as usize)
        })
        .collect()
}
