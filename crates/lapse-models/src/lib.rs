//! Shared data models for the skylapse capture pipeline.
//!
//! This crate provides plain, I/O-free types for:
//! - Per-site location configuration
//! - Sun-relative phase classification
//! - Weather snapshots and overlay text derivations
//! - Object storage key layout (frames, `latest` alias, timelapse videos)
//! - Timelapse encoding settings

pub mod encoding;
pub mod error;
pub mod keys;
pub mod location;
pub mod phase;
pub mod weather;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use keys::FrameKey;
pub use location::{LocationConfig, SourceKind};
pub use phase::{classify, classify_minutes, PhaseTag, DEFAULT_TIMELAPSE_TAGS};
pub use weather::{compass_point, fahrenheit_to_celsius, round_tenth, WeatherSnapshot};
