//! Short-time Fourier transform

use rustfft::{num_complex::Complex, num_traits::Zero, FftPlanner};

/// Periodic Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|k| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * k as f32 / n as f32).cos())
        .collect()
}

/// Magnitude spectrogram with centered frames
///
/// The signal is zero padded by `n_fft / 2` on both sides so that frame `f`
/// is centered on sample `f * hop`. Returns one row of `n_fft / 2 + 1`
/// magnitudes per frame; an empty signal yields no frames.
pub fn magnitude_spectrogram(samples: &[f32], n_fft: usize, hop: usize) -> Vec<Vec<f32>> {
    if samples.is_empty() || n_fft == 0 || hop == 0 {
        return Vec::new();
    }

    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let window = hann_window(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let bins = n_fft / 2 + 1;
    let num_frames = 1 + (padded.len() - n_fft) / hop;
    let mut frames = Vec::with_capacity(num_frames);
    let mut buffer: Vec<Complex<f32>> = vec![Complex::zero(); n_fft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        for (k, slot) in buffer.iter_mut().enumerate() {
            *slot = Complex::new(padded[start + k] * window[k], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..bins].iter().map(|c| c.norm()).collect());
    }

    frames
}
