//! Signal processing primitives used by the native backend
//!
//! All functions are pure and operate on mono `f32` buffers. Frame indices
//! refer to STFT frames of [`HOP_LENGTH`] samples with centered windows, so
//! frame `f` is centered on sample `f * HOP_LENGTH`.

pub mod beat_tracker;
pub mod chroma;
pub mod onset;
pub mod segmentation;
pub mod stft;
pub mod tempogram;

/// FFT size for spectral features
pub const N_FFT: usize = 2048;

/// Samples between successive STFT frames
pub const HOP_LENGTH: usize = 512;

/// Convert a frame index to seconds
pub fn frame_to_time(frame: usize, sample_rate: u32, hop_length: usize) -> f64 {
    (frame * hop_length) as f64 / sample_rate as f64
}

/// Onset envelope frames per second
pub fn frame_rate(sample_rate: u32, hop_length: usize) -> f64 {
    sample_rate as f64 / hop_length as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_time() {
        assert_eq!(frame_to_time(0, 22_050, HOP_LENGTH), 0.0);
        assert!((frame_to_time(43, 22_050, HOP_LENGTH) - 0.998_458).abs() < 1e-5);
    }
}
