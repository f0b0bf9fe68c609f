//! HTTP API handlers for drill-music

pub mod health;
pub mod music;

pub use health::health_routes;
pub use music::music_routes;
