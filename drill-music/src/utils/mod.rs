//! Utility modules

pub mod audio_decoder;

pub use audio_decoder::{load_audio, DecodeError, LoadedAudio};
