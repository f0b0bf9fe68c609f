//! Dynamic-programming beat tracker
//!
//! Estimates a global tempo from the onset envelope, then finds the beat
//! sequence that best trades off onset strength against deviation from the
//! ideal beat period (Ellis, 2007).
//!
//! **Algorithm:**
//! 1. Tempo from the autocorrelation tempogram
//! 2. Local score: onset envelope smoothed by a Gaussian of one beat period
//! 3. Forward pass: each frame links back to the best predecessor in
//!    `[-2 * period, -period / 2]`, penalized by squared log deviation
//! 4. Pick the last strong cumulative-score peak and backtrack
//! 5. Trim weak beats at both ends

use super::tempogram::{estimate_tempo, median};

/// Penalty weight for deviating from the ideal beat period
pub const TIGHTNESS: f64 = 100.0;

/// Tempo and beat frames from one tracking pass
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrackOutput {
    /// Estimated tempo in BPM, 0.0 when the envelope has no onsets
    pub tempo: f64,
    /// Beat positions as onset-envelope frame indices, strictly increasing
    pub beats: Vec<usize>,
}

impl BeatTrackOutput {
    fn silent() -> Self {
        Self {
            tempo: 0.0,
            beats: Vec::new(),
        }
    }
}

/// Track beats in an onset envelope sampled at `frames_per_second`
pub fn track_beats(envelope: &[f32], frames_per_second: f64) -> BeatTrackOutput {
    if !envelope.iter().any(|v| *v != 0.0) {
        return BeatTrackOutput::silent();
    }

    let Some(tempo) = estimate_tempo(envelope, frames_per_second) else {
        return BeatTrackOutput::silent();
    };

    let beats = beats_for_tempo(envelope, tempo, frames_per_second);
    BeatTrackOutput { tempo, beats }
}

/// Beat frames for a known tempo
pub fn beats_for_tempo(envelope: &[f32], bpm: f64, frames_per_second: f64) -> Vec<usize> {
    if !(bpm > 0.0) || envelope.is_empty() {
        return Vec::new();
    }

    let period = ((60.0 * frames_per_second / bpm).round() as usize).max(1);
    let localscore = local_score(envelope, period);
    let (backlink, cumscore) = dynamic_program(&localscore, period, TIGHTNESS);

    let Some(last) = last_beat(&cumscore) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut cursor = last;
    while backlink[cursor] >= 0 {
        cursor = backlink[cursor] as usize;
        beats.push(cursor);
    }
    beats.reverse();

    trim_beats(&localscore, &beats)
}

/// Envelope scaled by its sample standard deviation
fn normalize_onsets(envelope: &[f32]) -> Vec<f64> {
    let values: Vec<f64> = envelope.iter().map(|v| *v as f64).collect();
    if values.len() < 2 {
        return values;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let std = variance.sqrt();
    if std > 0.0 {
        values.iter().map(|v| v / std).collect()
    } else {
        values
    }
}

/// Onsets convolved with a Gaussian spanning one period on each side
fn local_score(envelope: &[f32], period: usize) -> Vec<f64> {
    let onsets = normalize_onsets(envelope);
    let p = period as isize;
    let kernel: Vec<f64> = (-p..=p)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period as f64).powi(2)).exp())
        .collect();

    convolve_same(&onsets, &kernel)
}

/// Linear convolution cropped to the input length, centered like `mode="same"`
fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len() as isize;
    let m = kernel.len() as isize;
    let offset = (m - 1) / 2;

    (0..n)
        .map(|i| {
            let mut acc = 0.0;
            for k in 0..m {
                let j = i + offset - k;
                if (0..n).contains(&j) {
                    acc += signal[j as usize] * kernel[k as usize];
                }
            }
            acc
        })
        .collect()
}

/// Forward pass; returns back-links (negative for "no predecessor") and
/// cumulative scores
fn dynamic_program(localscore: &[f64], period: usize, tightness: f64) -> (Vec<isize>, Vec<f64>) {
    let n = localscore.len();
    let mut backlink = vec![-1isize; n];
    let mut cumscore = vec![0.0f64; n];

    let p = period as isize;
    let nearest = (period as f64 / 2.0).round_ties_even() as isize;
    let offsets: Vec<isize> = (-2 * p..=-nearest).collect();
    let txwt: Vec<f64> = offsets
        .iter()
        .map(|&w| -tightness * ((-w) as f64 / period as f64).ln().powi(2))
        .collect();

    let score_max = localscore.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = 0.01 * score_max;
    let mut first_beat = true;

    for (i, &score_i) in localscore.iter().enumerate() {
        let mut best_idx = 0usize;
        let mut best_val = f64::NEG_INFINITY;
        for (j, (&w, &weight)) in offsets.iter().zip(txwt.iter()).enumerate() {
            let target = i as isize + w;
            let candidate = if target >= 0 {
                weight + cumscore[target as usize]
            } else {
                weight
            };
            if candidate > best_val {
                best_val = candidate;
                best_idx = j;
            }
        }

        cumscore[i] = score_i + best_val;
        if first_beat && score_i < threshold {
            backlink[i] = -1;
        } else {
            backlink[i] = i as isize + offsets[best_idx];
            first_beat = false;
        }
    }

    (backlink, cumscore)
}

/// Local maxima with edge replication: `x[i] > x[i-1] && x[i] >= x[i+1]`
fn local_maxima(values: &[f64]) -> Vec<bool> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let prev = if i == 0 { values[0] } else { values[i - 1] };
            let next = if i + 1 == n { values[n - 1] } else { values[i + 1] };
            values[i] > prev && values[i] >= next
        })
        .collect()
}

/// Last frame whose cumulative score is a strong local maximum
fn last_beat(cumscore: &[f64]) -> Option<usize> {
    let maxes = local_maxima(cumscore);
    let mut peak_scores: Vec<f32> = cumscore
        .iter()
        .zip(maxes.iter())
        .filter(|(_, is_max)| **is_max)
        .map(|(s, _)| *s as f32)
        .collect();
    if peak_scores.is_empty() {
        return None;
    }
    let med = median(&mut peak_scores) as f64;

    (0..cumscore.len())
        .rev()
        .find(|&i| (if maxes[i] { 2.0 * cumscore[i] } else { 0.0 }) > med)
}

/// Drop leading and trailing beats whose smoothed local score is weak
///
/// The final beat above threshold is dropped along with the tail.
fn trim_beats(localscore: &[f64], beats: &[usize]) -> Vec<usize> {
    const HANN5: [f64; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];

    let scores: Vec<f64> = beats.iter().map(|&b| localscore[b]).collect();
    let smooth = convolve_same(&scores, &HANN5);
    if smooth.is_empty() {
        return Vec::new();
    }

    let rms = (smooth.iter().map(|v| v * v).sum::<f64>() / smooth.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = smooth.iter().position(|v| *v > threshold);
    let last = smooth.iter().rposition(|v| *v > threshold);
    match (first, last) {
        (Some(first), Some(last)) => beats[first..last].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{frame_rate, HOP_LENGTH};

    fn pulse_envelope(len: usize, period: usize, phase: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i >= phase && (i - phase) % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_silence_yields_no_tempo() {
        let out = track_beats(&vec![0.0; 1000], frame_rate(22_050, HOP_LENGTH));
        assert_eq!(out, BeatTrackOutput::silent());
    }

    #[test]
    fn test_pulse_train_beats_follow_pulses() {
        let fps = frame_rate(22_050, HOP_LENGTH);
        let env = pulse_envelope(1300, 22, 5);
        let out = track_beats(&env, fps);

        assert!(out.tempo > 0.0);
        assert!(out.beats.len() > 20, "beats: {:?}", out.beats);
        for pair in out.beats.windows(2) {
            assert!(pair[1] > pair[0]);
            assert_eq!(pair[1] - pair[0], 22);
        }
        for beat in &out.beats {
            assert_eq!((beat - 5) % 22, 0, "beat {beat} off the pulse grid");
        }
    }

    #[test]
    fn test_convolve_same_centers_kernel() {
        let out = convolve_same(&[0.0, 1.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_local_maxima_edges() {
        let maxes = local_maxima(&[1.0, 3.0, 2.0, 2.0, 5.0]);
        assert_eq!(maxes, vec![false, true, false, false, true]);
    }

    #[test]
    fn test_trim_drops_weak_ends() {
        let localscore = vec![0.0, 0.1, 5.0, 5.0, 5.0, 5.0, 5.0, 0.1, 0.0];
        let beats: Vec<usize> = (0..9).collect();
        let trimmed = trim_beats(&localscore, &beats);
        assert!(!trimmed.is_empty());
        assert!(trimmed[0] >= 1);
        assert!(*trimmed.last().unwrap() <= 7);
    }
}
