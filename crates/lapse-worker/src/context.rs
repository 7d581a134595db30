//! Shared collaborators used to build every location.

use std::sync::Arc;

use tracing::info;

use lapse_media::{grabber_for, Annotator, FfmpegEncoder, VideoEncoder};
use lapse_models::{EncodingConfig, LocationConfig};
use lapse_storage::{ObjectStore, SpacesClient};
use lapse_weather::{WeatherClient, WeatherProvider};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::fetcher::BatchFetcher;
use crate::location::Location;
use crate::timelapse::TimelapseAssembler;

/// Process-wide services, built once at start-up and passed explicitly.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub weather: Arc<dyn WeatherProvider>,
    pub store: Arc<dyn ObjectStore>,
    pub annotator: Annotator,
    pub assembler: Arc<TimelapseAssembler>,
}

impl WorkerContext {
    pub fn new(
        config: WorkerConfig,
        weather: Arc<dyn WeatherProvider>,
        store: Arc<dyn ObjectStore>,
        encoder: Arc<dyn VideoEncoder>,
        annotator: Annotator,
    ) -> Self {
        let fetcher = BatchFetcher::new(
            Arc::clone(&store),
            config.max_download_parallel,
            config.settle_delay,
        );
        let assembler = Arc::new(TimelapseAssembler::new(
            Arc::clone(&store),
            fetcher,
            encoder,
            config.work_dir.clone(),
            config.max_list_keys,
        ));

        Self {
            config,
            weather,
            store,
            annotator,
            assembler,
        }
    }

    /// Build the production services from environment variables.
    pub fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let weather = WeatherClient::from_env()?;
        let store = SpacesClient::from_env().map_err(|e| WorkerError::config_error(e.to_string()))?;
        let encoder = FfmpegEncoder::new(EncodingConfig::default())
            .with_timeout(config.encode_timeout.as_secs().max(1));

        let annotator = match &config.font_path {
            Some(path) => {
                Annotator::from_font_file(path).map_err(|e| WorkerError::config_error(e.to_string()))?
            }
            None => Annotator::without_text(),
        };

        info!(
            work_dir = %config.work_dir.display(),
            font = annotator.has_font(),
            "Worker context ready"
        );

        Ok(Self::new(
            config,
            Arc::new(weather),
            Arc::new(store),
            Arc::new(encoder),
            annotator,
        ))
    }

    /// Build a location whose frame grabber is picked from its URL scheme.
    pub fn location(&self, config: LocationConfig) -> WorkerResult<Location> {
        let grabber = grabber_for(&config, &self.config.scratch_dir(), self.config.capture_timeout)
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        Location::new(
            config,
            Arc::clone(&self.weather),
            grabber,
            self.annotator.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.assembler),
        )
    }

    /// Build every location; the first invalid one aborts start-up.
    pub fn locations(&self, configs: Vec<LocationConfig>) -> WorkerResult<Vec<Location>> {
        configs.into_iter().map(|c| self.location(c)).collect()
    }
}
