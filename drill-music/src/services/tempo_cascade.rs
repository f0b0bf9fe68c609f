//! Tempo cascade estimator
//!
//! Tries tempo strategies in a fixed priority order and keeps the first one
//! that succeeds. Strategy failures are expected (silence, sparse material,
//! backend errors) and only logged at debug level. The cascade itself never
//! fails: if every strategy is rejected the tempo falls back to
//! [`DEFAULT_BPM`].

use crate::models::{BeatGrid, TempoSource, DEFAULT_BPM};
use crate::services::backend::{BackendError, SignalBackend};
use thiserror::Error;
use tracing::debug;

/// Why a strategy was rejected
#[derive(Debug, Error)]
pub enum StrategyFailure {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("non-positive tempo {0}")]
    NonPositiveTempo(f64),

    #[error("no tempo candidates")]
    NoCandidates,

    #[error("only {0} onsets detected")]
    TooFewOnsets(usize),

    #[error("no positive inter-onset intervals")]
    NoIntervals,
}

/// Tempo produced by a single strategy
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f64,
    /// Beat timestamps, when the strategy locates beats itself
    pub beats: Option<Vec<f64>>,
}

type StrategyFn = fn(&dyn SignalBackend, &[f32], u32) -> Result<TempoEstimate, StrategyFailure>;

/// Named, fallible tempo strategy
pub struct TempoStrategy {
    pub name: &'static str,
    pub source: TempoSource,
    pub run: StrategyFn,
}

/// Strategies in priority order
pub const TEMPO_STRATEGIES: &[TempoStrategy] = &[
    TempoStrategy {
        name: "beat_tracking",
        source: TempoSource::BeatTracking,
        run: beat_tracking,
    },
    TempoStrategy {
        name: "aggregate_tempo",
        source: TempoSource::AggregateTempo,
        run: aggregate_tempo,
    },
    TempoStrategy {
        name: "onset_interval",
        source: TempoSource::OnsetInterval,
        run: onset_interval,
    },
];

fn positive(bpm: f64) -> Result<f64, StrategyFailure> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(StrategyFailure::NonPositiveTempo(bpm))
    }
}

fn beat_tracking(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
) -> Result<TempoEstimate, StrategyFailure> {
    let track = backend.beat_track(samples, sample_rate)?;
    let bpm = positive(track.tempo)?;
    let beats = backend.frames_to_time(&track.beat_frames, sample_rate);

    Ok(TempoEstimate {
        bpm,
        beats: (!beats.is_empty()).then_some(beats),
    })
}

fn aggregate_tempo(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
) -> Result<TempoEstimate, StrategyFailure> {
    let candidates = backend.tempo(samples, sample_rate)?;
    let first = candidates.first().copied().ok_or(StrategyFailure::NoCandidates)?;

    Ok(TempoEstimate {
        bpm: positive(first)?,
        beats: None,
    })
}

fn onset_interval(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
) -> Result<TempoEstimate, StrategyFailure> {
    let frames = backend.onset_detect(samples, sample_rate)?;
    if frames.len() < 2 {
        return Err(StrategyFailure::TooFewOnsets(frames.len()));
    }

    let times = backend.frames_to_time(&frames, sample_rate);
    let mut intervals: Vec<f64> = times
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|d| *d > 0.0)
        .collect();
    if intervals.is_empty() {
        return Err(StrategyFailure::NoIntervals);
    }

    intervals.sort_by(|a, b| a.total_cmp(b));
    let mid = intervals.len() / 2;
    let median = if intervals.len() % 2 == 0 {
        (intervals[mid - 1] + intervals[mid]) / 2.0
    } else {
        intervals[mid]
    };

    Ok(TempoEstimate {
        bpm: positive(60.0 / median)?,
        beats: None,
    })
}

/// Evenly spaced beats from 0 while `< duration`; always at least `[0.0]`
pub fn synthesize_beats(bpm: f64, duration: f64) -> Vec<f64> {
    let step = 60.0 / bpm;
    let mut beats = vec![0.0];
    if !(step.is_finite() && step > 0.0) {
        return beats;
    }

    let mut i = 1usize;
    loop {
        let t = i as f64 * step;
        if !(t < duration) {
            break;
        }
        beats.push(t);
        i += 1;
    }
    beats
}

/// Run `strategies` in order, returning the first accepted estimate
pub fn run_cascade(
    strategies: &[TempoStrategy],
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
) -> (TempoEstimate, TempoSource) {
    for strategy in strategies {
        match (strategy.run)(backend, samples, sample_rate) {
            Ok(estimate) => {
                debug!(strategy = strategy.name, bpm = estimate.bpm, "Tempo strategy accepted");
                return (estimate, strategy.source);
            }
            Err(e) => {
                debug!(strategy = strategy.name, reason = %e, "Tempo strategy rejected");
            }
        }
    }

    debug!(bpm = DEFAULT_BPM, "All tempo strategies rejected, using default");
    (
        TempoEstimate {
            bpm: DEFAULT_BPM,
            beats: None,
        },
        TempoSource::Default,
    )
}

/// Tempo and beat grid for a buffer of `duration` seconds
///
/// Beats come from the beat tracker when it located any; otherwise they are
/// synthesized from the chosen tempo.
pub fn estimate_beat_grid(
    backend: &dyn SignalBackend,
    samples: &[f32],
    sample_rate: u32,
    duration: f64,
) -> BeatGrid {
    let (estimate, source) = run_cascade(TEMPO_STRATEGIES, backend, samples, sample_rate);
    let beats = estimate
        .beats
        .unwrap_or_else(|| synthesize_beats(estimate.bpm, duration));

    BeatGrid {
        bpm: estimate.bpm,
        beats,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order() {
        let names: Vec<&str> = TEMPO_STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["beat_tracking", "aggregate_tempo", "onset_interval"]);
    }

    #[test]
    fn test_synthesize_beats() {
        let beats = synthesize_beats(120.0, 10.0);
        assert_eq!(beats.len(), 20);
        assert_eq!(beats[0], 0.0);
        assert!((beats[19] - 9.5).abs() < 1e-9);

        // Window boundary is exclusive
        assert_eq!(synthesize_beats(60.0, 3.0), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_synthesize_beats_never_empty() {
        assert_eq!(synthesize_beats(120.0, 0.0), vec![0.0]);
        assert_eq!(synthesize_beats(120.0, -1.0), vec![0.0]);
        assert_eq!(synthesize_beats(0.0, 10.0), vec![0.0]);
    }

    #[test]
    fn test_positive_rejects_bad_tempi() {
        assert!(positive(0.0).is_err());
        assert!(positive(-3.0).is_err());
        assert!(positive(f64::NAN).is_err());
        assert_eq!(positive(90.0).unwrap(), 90.0);
    }
}
