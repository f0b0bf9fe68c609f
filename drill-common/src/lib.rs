//! # Drill Common Library
//!
//! Shared code for the drill services:
//! - Common error type
//! - TOML bootstrap configuration loading
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
