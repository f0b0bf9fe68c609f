//! Onset strength envelope and onset peak picking
//!
//! The envelope is the positive spectral flux of the log-power spectrogram,
//! averaged over frequency bins. Onsets are local maxima of the normalized
//! envelope that rise above a moving average by a fixed delta.

use super::stft::magnitude_spectrogram;

/// Dynamic range kept below the loudest bin, in dB
const TOP_DB: f32 = 80.0;

/// Power floor before taking the logarithm
const AMIN: f32 = 1e-10;

/// Onset strength per STFT frame
///
/// Frame 0 has no predecessor and is always zero. Silence yields an all-zero
/// envelope.
pub fn onset_strength(samples: &[f32], n_fft: usize, hop: usize) -> Vec<f32> {
    let spectrogram = magnitude_spectrogram(samples, n_fft, hop);
    if spectrogram.is_empty() {
        return Vec::new();
    }

    let mut log_power: Vec<Vec<f32>> = spectrogram
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|m| 10.0 * (m * m).max(AMIN).log10())
                .collect()
        })
        .collect();

    let peak_db = log_power
        .iter()
        .flat_map(|frame| frame.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor_db = peak_db - TOP_DB;
    for frame in log_power.iter_mut() {
        for value in frame.iter_mut() {
            *value = value.max(floor_db);
        }
    }

    let mut envelope = vec![0.0f32; log_power.len()];
    for t in 1..log_power.len() {
        let (prev, cur) = (&log_power[t - 1], &log_power[t]);
        let flux: f32 = cur
            .iter()
            .zip(prev.iter())
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope[t] = flux / cur.len() as f32;
    }

    envelope
}

/// Peak picking parameters, in frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub delta: f32,
    pub wait: usize,
}

impl PeakPickParams {
    /// Standard onset picking windows (30 ms max, 100 ms average, 30 ms wait)
    pub fn for_frame_rate(frames_per_second: f64) -> Self {
        let frames = |seconds: f64| (seconds * frames_per_second).floor() as usize;
        Self {
            pre_max: frames(0.03),
            post_max: frames(0.0) + 1,
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            delta: 0.07,
            wait: frames(0.03),
        }
    }
}

/// Indices of envelope peaks
///
/// A frame `n` is a peak when it is the maximum of `[n - pre_max, n + post_max)`,
/// is at least `delta` above the mean of `[n - pre_avg, n + post_avg)`, is
/// positive, and comes more than `wait` frames after the previous peak.
pub fn peak_pick(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let len = envelope.len();
    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;

    for n in 0..len {
        let value = envelope[n];
        if value <= 0.0 {
            continue;
        }

        let max_lo = n.saturating_sub(params.pre_max);
        let max_hi = (n + params.post_max).min(len);
        let local_max = envelope[max_lo..max_hi]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if value < local_max {
            continue;
        }

        let avg_lo = n.saturating_sub(params.pre_avg);
        let avg_hi = (n + params.post_avg).min(len);
        let window = &envelope[avg_lo..avg_hi];
        let local_mean = window.iter().sum::<f32>() / window.len() as f32;
        if value < local_mean + params.delta {
            continue;
        }

        if let Some(last) = last_peak {
            if n <= last + params.wait {
                continue;
            }
        }

        peaks.push(n);
        last_peak = Some(n);
    }

    peaks
}

/// Onset frames of an envelope, using peak picking on the min-max normalized curve
///
/// Returns an empty list for a flat envelope.
pub fn detect_onsets(envelope: &[f32], frames_per_second: f64) -> Vec<usize> {
    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if envelope.is_empty() || !(max > min) {
        return Vec::new();
    }

    let range = max - min;
    let normalized: Vec<f32> = envelope.iter().map(|v| (v - min) / range).collect();
    peak_pick(&normalized, &PeakPickParams::for_frame_rate(frames_per_second))
}
