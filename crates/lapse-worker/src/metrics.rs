//! Prometheus metrics for the capture daemon and timelapse jobs.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    // Capture metrics
    pub const CAPTURES_TOTAL: &str = "skylapse_captures_total";
    pub const CAPTURE_DURATION_SECONDS: &str = "skylapse_capture_duration_seconds";

    // Timelapse metrics
    pub const FRAMES_FETCHED_TOTAL: &str = "skylapse_frames_fetched_total";
    pub const FRAMES_SKIPPED_TOTAL: &str = "skylapse_frames_skipped_total";
    pub const TIMELAPSES_TOTAL: &str = "skylapse_timelapses_total";
    pub const TIMELAPSE_DURATION_SECONDS: &str = "skylapse_timelapse_duration_seconds";
}

/// Serve Prometheus metrics on `0.0.0.0:{port}`.
pub fn init_metrics(port: u16) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to install metrics exporter: {}", e)))
}

/// Record one capture cycle. `outcome` is "stored", "skipped" or a failed stage.
pub fn record_capture(prefix: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("prefix", prefix.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::CAPTURES_TOTAL, &labels).increment(1);
    histogram!(names::CAPTURE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how many frames a batch actually transferred versus reused.
pub fn record_fetch(prefix: &str, fetched: usize, skipped: usize) {
    let labels = [("prefix", prefix.to_string())];
    counter!(names::FRAMES_FETCHED_TOTAL, &labels).increment(fetched as u64);
    counter!(names::FRAMES_SKIPPED_TOTAL, &labels).increment(skipped as u64);
}

/// Record a timelapse job.
pub fn record_timelapse(prefix: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("prefix", prefix.to_string()),
        ("status", if success { "success" } else { "failed" }.to_string()),
    ];
    counter!(names::TIMELAPSES_TOTAL, &labels).increment(1);
    histogram!(names::TIMELAPSE_DURATION_SECONDS, &labels).record(duration_secs);
}
