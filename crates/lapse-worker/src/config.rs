//! Worker configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lapse_models::encoding::DEFAULT_TIMELAPSE_SECONDS;
use lapse_models::LocationConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for scratch frames and timelapse staging
    pub work_dir: PathBuf,
    /// JSON file listing the capture sites
    pub sites_file: PathBuf,
    /// Font for text overlays
    pub font_path: Option<PathBuf>,
    /// Maximum concurrent object downloads per timelapse
    pub max_download_parallel: usize,
    /// Pause between the download barrier and re-indexing
    pub settle_delay: Duration,
    /// Target timelapse length in seconds
    pub timelapse_seconds: u32,
    /// Listing cap per day
    pub max_list_keys: usize,
    /// RTSP/HTTP frame grab timeout
    pub capture_timeout: Duration,
    /// FFmpeg encode timeout
    pub encode_timeout: Duration,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/skylapse"),
            sites_file: PathBuf::from("sites.json"),
            font_path: None,
            max_download_parallel: 20,
            settle_delay: Duration::from_millis(2000),
            timelapse_seconds: DEFAULT_TIMELAPSE_SECONDS,
            max_list_keys: 3000,
            capture_timeout: Duration::from_secs(30),
            encode_timeout: Duration::from_secs(1800),
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_dir: std::env::var("LAPSE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            sites_file: std::env::var("LAPSE_SITES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.sites_file),
            font_path: std::env::var("LAPSE_FONT_PATH").ok().map(PathBuf::from),
            max_download_parallel: std::env::var("LAPSE_DOWNLOAD_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_download_parallel),
            settle_delay: Duration::from_millis(
                std::env::var("LAPSE_SETTLE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            timelapse_seconds: std::env::var("LAPSE_TIMELAPSE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timelapse_seconds),
            max_list_keys: std::env::var("LAPSE_MAX_LIST_KEYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_list_keys),
            capture_timeout: Duration::from_secs(
                std::env::var("LAPSE_CAPTURE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            encode_timeout: Duration::from_secs(
                std::env::var("LAPSE_ENCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Directory for per-location RTSP scratch frames.
    pub fn scratch_dir(&self) -> PathBuf {
        self.work_dir.join("scratch")
    }

    /// Load and validate the configured site list.
    pub fn load_locations(&self) -> WorkerResult<Vec<LocationConfig>> {
        load_locations(&self.sites_file)
    }
}

/// Read a JSON array of [`LocationConfig`] and validate every entry.
///
/// Prefixes must be unique: they name buckets, scratch files and staging
/// directories.
pub fn load_locations(path: &Path) -> WorkerResult<Vec<LocationConfig>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        WorkerError::config_error(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_locations(&raw)
}

pub fn parse_locations(raw: &str) -> WorkerResult<Vec<LocationConfig>> {
    let locations: Vec<LocationConfig> = serde_json::from_str(raw)
        .map_err(|e| WorkerError::config_error(format!("invalid sites file: {}", e)))?;

    if locations.is_empty() {
        return Err(WorkerError::config_error("sites file lists no locations"));
    }

    let mut seen = HashSet::new();
    for location in &locations {
        location
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        if !seen.insert(location.prefix.as_str()) {
            return Err(WorkerError::config_error(format!(
                "duplicate location prefix '{}'",
                location.prefix
            )));
        }
    }

    Ok(locations)
}
