//! Timelapse capture worker.
//!
//! This crate provides:
//! - Per-location capture cycles (weather, phase, acquire, annotate, store)
//! - The minute-tick capture daemon
//! - Resumable batch fetch and daily timelapse assembly

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod location;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod staging;
pub mod timelapse;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::CaptureExecutor;
pub use fetcher::{BatchFetcher, FetchReport};
pub use location::{CaptureOutcome, Location, VideoUpload};
pub use logging::{init_tracing, LocationLogger};
pub use scheduler::should_capture;
pub use staging::StagingDir;
pub use timelapse::{Timelapse, TimelapseAssembler};
