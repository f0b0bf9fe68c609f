//! Test Helper Utilities
//!
//! Shared utilities for testing drill-music

#![allow(dead_code)]

pub mod audio_generator;
pub mod scripted_backend;

pub use audio_generator::{generate_test_wav, write_bytes_file, AudioConfig, TestSignal};
pub use scripted_backend::ScriptedBackend;
