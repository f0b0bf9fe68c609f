//! Autocorrelation tempogram and global tempo estimation

use super::stft::hann_window;
use rustfft::{num_complex::Complex, num_traits::Zero, FftPlanner};

/// Onset frames per tempogram analysis window (about 8.9 s at 22.05 kHz)
pub const TEMPOGRAM_WIN_LENGTH: usize = 384;

/// Center of the log-normal tempo prior
pub const START_BPM: f64 = 120.0;

/// Width of the tempo prior in octaves
pub const STD_BPM: f64 = 1.0;

/// Tempi above this are never selected
pub const MAX_TEMPO: f64 = 320.0;

/// Local autocorrelation of the onset envelope, one row per frame
///
/// Each row has `win_length` lags and is normalized by its lag-0 value.
/// Rows of an all-zero neighbourhood stay zero.
pub fn autocorrelation_tempogram(envelope: &[f32], win_length: usize) -> Vec<Vec<f32>> {
    if envelope.is_empty() || win_length == 0 {
        return Vec::new();
    }

    let half = win_length / 2;
    let mut padded = vec![0.0f32; envelope.len() + win_length];
    padded[half..half + envelope.len()].copy_from_slice(envelope);

    let window = hann_window(win_length);
    let fft_len = (2 * win_length).next_power_of_two();
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut rows = Vec::with_capacity(envelope.len());
    let mut buffer: Vec<Complex<f32>> = vec![Complex::zero(); fft_len];

    for frame_idx in 0..envelope.len() {
        let segment = &padded[frame_idx..frame_idx + win_length];
        for slot in buffer.iter_mut() {
            *slot = Complex::zero();
        }
        for (k, (x, w)) in segment.iter().zip(window.iter()).enumerate() {
            buffer[k].re = x * w;
        }

        forward.process(&mut buffer);
        for v in buffer.iter_mut() {
            *v = Complex::new(v.norm_sqr(), 0.0);
        }
        inverse.process(&mut buffer);

        let lag0 = buffer[0].re;
        let row: Vec<f32> = if lag0 > f32::EPSILON {
            buffer[..win_length].iter().map(|c| c.re / lag0).collect()
        } else {
            vec![0.0; win_length]
        };
        rows.push(row);
    }

    rows
}

/// Median of each lag across all tempogram rows
pub fn median_over_time(tempogram: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = tempogram.first() else {
        return Vec::new();
    };

    let mut column = Vec::with_capacity(tempogram.len());
    (0..first.len())
        .map(|lag| {
            column.clear();
            column.extend(tempogram.iter().map(|row| row[lag]));
            median(&mut column)
        })
        .collect()
}

/// Median of a slice, averaging the two middle values for even lengths
pub fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Bias toward tempi near [`START_BPM`], in log-probability units
fn log_prior(bpm: f64) -> f64 {
    let z = (bpm.log2() - START_BPM.log2()) / STD_BPM;
    -0.5 * z * z
}

/// Global tempo of an onset envelope
///
/// Picks the lag maximizing `ln(1 + 1e6 * autocorrelation) + prior`, where
/// the autocorrelation is the time-median of the tempogram. Returns `None`
/// for a flat envelope, where no periodicity can be observed.
pub fn estimate_tempo(envelope: &[f32], frames_per_second: f64) -> Option<f64> {
    if !envelope.iter().any(|v| *v > 0.0) || !(frames_per_second > 0.0) {
        return None;
    }

    let tempogram = autocorrelation_tempogram(envelope, TEMPOGRAM_WIN_LENGTH);
    let aggregate = median_over_time(&tempogram);
    if !aggregate.iter().skip(1).any(|v| *v > 0.0) {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    for (lag, &strength) in aggregate.iter().enumerate().skip(1) {
        let bpm = 60.0 * frames_per_second / lag as f64;
        if bpm > MAX_TEMPO {
            continue;
        }
        let score = (1e6 * strength.max(0.0) as f64).ln_1p() + log_prior(bpm);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((bpm, score));
        }
    }

    best.map(|(bpm, _)| bpm)
}
