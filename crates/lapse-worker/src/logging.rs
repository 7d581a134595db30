//! Structured per-location logging utilities.
//!
//! Provides consistent log lines for capture cycles and timelapse jobs,
//! always tagged with the location prefix and the operation.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Location logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct LocationLogger {
    prefix: String,
    operation: String,
}

impl LocationLogger {
    /// Create a new logger for a location and operation (e.g. "capture", "timelapse").
    pub fn new(prefix: &str, operation: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            prefix = %self.prefix,
            operation = %self.operation,
            "Started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            prefix = %self.prefix,
            operation = %self.operation,
            "Progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            prefix = %self.prefix,
            operation = %self.operation,
            "Warning: {}", message
        );
    }

    /// Log a failure together with the stage it happened in.
    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            prefix = %self.prefix,
            operation = %self.operation,
            stage = %stage,
            "Failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            prefix = %self.prefix,
            operation = %self.operation,
            "Completed: {}", message
        );
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this location and operation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "location",
            prefix = %self.prefix,
            operation = %self.operation
        )
    }
}

/// Initialize tracing: JSON when `LOG_FORMAT=json`, colored text otherwise.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lapse=info,aws_config=warn,aws_smithy_runtime=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
