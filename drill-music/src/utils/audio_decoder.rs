//! Audio Decoding Utilities
//!
//! Decodes an audio file to mono f32 PCM at the analysis sample rate.
//!
//! Uses symphonia for format-agnostic decoding (MP3, WAV, M4A, FLAC, OGG) and
//! rubato for sample rate conversion.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use thiserror::Error;
use tracing::debug;

/// Typed decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open audio file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio decode failed: {0}")]
    Decode(String),

    #[error("Audio resampling failed: {0}")]
    Resample(String),

    #[error("No audio samples could be decoded from {0}")]
    Empty(PathBuf),
}

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    /// Mono samples, possibly truncated to the requested duration cap
    pub samples: Vec<f32>,
    /// Sample rate of `samples` in Hz
    pub sample_rate: u32,
    /// Duration of the whole source file in seconds, independent of truncation
    pub total_duration: f64,
}

impl LoadedAudio {
    /// Duration covered by `samples` in seconds
    pub fn buffer_duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file to mono f32 samples at `target_rate`
///
/// **Algorithm:**
/// 1. Probe the container and pick the first decodable audio track
/// 2. Decode packets, averaging channels to mono
/// 3. Stop storing samples once `duration_cap` seconds are buffered
/// 4. Resample to `target_rate` when the native rate differs
///
/// The total duration comes from the container frame count when known,
/// otherwise decoding continues past the cap to count frames.
///
/// # Arguments
/// * `file_path` - Path to audio file
/// * `target_rate` - Output sample rate in Hz
/// * `duration_cap` - Optional truncation in seconds
///
/// # Errors
/// * [`DecodeError::Io`] - File cannot be opened
/// * [`DecodeError::UnsupportedFormat`] - Probe failure or no audio track
/// * [`DecodeError::Decode`] - Corrupt stream
/// * [`DecodeError::Empty`] - Zero samples decoded
pub fn load_audio(
    file_path: &Path,
    target_rate: u32,
    duration_cap: Option<f64>,
) -> Result<LoadedAudio, DecodeError> {
    debug!(path = %file_path.display(), ?duration_cap, "Decoding audio file");

    if target_rate == 0 {
        return Err(DecodeError::Resample("target sample rate must be positive".into()));
    }

    let file = std::fs::File::open(file_path).map_err(|source| DecodeError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(format!("cannot identify file: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat("no audio track found".into()))?;

    let track_id = track.id;
    let native_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("sample rate unknown".into()))?;
    let container_frames = track.codec_params.n_frames;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(format!("unsupported codec: {}", e)))?;

    let frame_limit = duration_cap.map(|cap| (cap.max(0.0) * native_rate as f64).ceil() as usize);

    let mut samples: Vec<f32> = Vec::new();
    let mut decoded_frames: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Decode(format!("error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupt packet; symphonia allows decoding to continue
                debug!(path = %file_path.display(), error = msg, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e.to_string())),
        };

        decoded_frames += decoded.frames() as u64;

        let remaining = frame_limit.map_or(usize::MAX, |limit| limit.saturating_sub(samples.len()));
        if remaining > 0 {
            mix_buffer_to_mono(&decoded, &mut samples, remaining);
        }

        let cap_reached = frame_limit.is_some_and(|limit| samples.len() >= limit);
        if cap_reached && container_frames.is_some() {
            break;
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty(file_path.to_path_buf()));
    }

    let total_frames = container_frames.unwrap_or(decoded_frames);
    let total_duration = total_frames as f64 / native_rate as f64;

    let samples = if native_rate != target_rate {
        resample_mono(samples, native_rate, target_rate)?
    } else {
        samples
    };

    let samples = match duration_cap {
        Some(cap) => {
            let max_len = (cap.max(0.0) * target_rate as f64).ceil() as usize;
            let mut samples = samples;
            samples.truncate(max_len);
            samples
        }
        None => samples,
    };

    debug!(
        path = %file_path.display(),
        native_rate = native_rate,
        sample_rate = target_rate,
        buffered_samples = samples.len(),
        total_duration = format!("{:.2}", total_duration),
        "Audio decoding complete"
    );

    Ok(LoadedAudio {
        samples,
        sample_rate: target_rate,
        total_duration,
    })
}

/// Append up to `limit` mono frames from a decoded packet
fn mix_buffer_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>, limit: usize) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::U16(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::U24(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::U32(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::S8(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::S16(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::S24(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::S32(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::F32(buf) => mix_channels(&**buf, out, limit),
        AudioBufferRef::F64(buf) => mix_channels(&**buf, out, limit),
    }
}

/// Average all channels of `buf` into `out`
fn mix_channels<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>, limit: usize)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames().min(limit);
    if num_channels == 0 {
        return;
    }

    out.reserve(num_frames);
    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        out.push(sum / num_channels as f32);
    }
}

/// Resample mono PCM with rubato's sinc interpolator
///
/// Processes the whole buffer as one chunk, then flushes the filter tail.
/// The interpolator's output delay is trimmed from the front so the result
/// is time-aligned with the input and has `ceil(len * ratio)` frames.
fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DecodeError> {
    let num_frames = samples.len();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let expected_frames = (num_frames as f64 * ratio).ceil() as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let input_channels = vec![samples];
    let mut resampled = resampler
        .process(&input_channels, None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?
        .pop()
        .unwrap_or_default();

    while resampled.len() < delay + expected_frames {
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?
            .pop()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        resampled.extend_from_slice(&tail);
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected_frames);

    debug!(
        input_frames = num_frames,
        source_rate = source_rate,
        output_frames = resampled.len(),
        output_delay = delay,
        target_rate = target_rate,
        "Resampled audio"
    );

    Ok(resampled)
}
