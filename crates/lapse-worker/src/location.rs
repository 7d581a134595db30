//! One capture site: capture cycles and daily timelapses.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, Instrument};

use lapse_media::{encode_png, Annotator, FrameGrabber, MediaError, Overlays};
use lapse_models::encoding::{FRAME_EXTENSION, VIDEO_EXTENSION};
use lapse_models::keys::{latest_key, video_key};
use lapse_models::{FrameKey, LocationConfig, PhaseTag};
use lapse_storage::{ObjectStore, PutOptions};
use lapse_weather::WeatherProvider;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::LocationLogger;
use crate::metrics::{record_capture, record_timelapse};
use crate::scheduler::should_capture;
use crate::timelapse::{Timelapse, TimelapseAssembler};

/// Result of one capture cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Gated out by the scheduler
    Skipped { phase: PhaseTag },
    /// Frame stored under `key` and under the `latest` alias
    Stored { key: String, phase: PhaseTag, bytes: usize },
}

/// Uploaded timelapse.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub key: String,
    pub frame_count: usize,
    pub frame_rate: u32,
    pub bytes: usize,
}

/// Capture site orchestrator.
///
/// Owns its configuration; collaborators are shared with other locations
/// but hold no per-location mutable state.
pub struct Location {
    config: LocationConfig,
    weather: Arc<dyn WeatherProvider>,
    grabber: Arc<dyn FrameGrabber>,
    annotator: Annotator,
    store: Arc<dyn ObjectStore>,
    assembler: Arc<TimelapseAssembler>,
}

impl Location {
    pub fn new(
        config: LocationConfig,
        weather: Arc<dyn WeatherProvider>,
        grabber: Arc<dyn FrameGrabber>,
        annotator: Annotator,
        store: Arc<dyn ObjectStore>,
        assembler: Arc<TimelapseAssembler>,
    ) -> WorkerResult<Self> {
        config
            .validate()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;

        if config.draws_text() && !annotator.has_font() {
            return Err(WorkerError::config_error(format!(
                "location '{}' draws text overlays but no font is configured",
                config.prefix
            )));
        }

        Ok(Self {
            config,
            weather,
            grabber,
            annotator,
            store,
            assembler,
        })
    }

    pub fn config(&self) -> &LocationConfig {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Run one capture cycle now.
    pub async fn process(&self) -> WorkerResult<CaptureOutcome> {
        self.process_at(Utc::now()).await
    }

    /// Run one capture cycle as if the clock read `now`.
    ///
    /// Any failure abandons the cycle before anything is stored, so the
    /// `latest` alias keeps the previous good frame.
    pub async fn process_at(&self, now: DateTime<Utc>) -> WorkerResult<CaptureOutcome> {
        let logger = LocationLogger::new(self.prefix(), "capture");
        let started = Instant::now();

        let result = self.capture(now).instrument(logger.create_span()).await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(CaptureOutcome::Skipped { phase }) => {
                debug!(prefix = %self.prefix(), phase = %phase, "Capture skipped by schedule");
                record_capture(self.prefix(), "skipped", elapsed);
            }
            Ok(CaptureOutcome::Stored { key, bytes, .. }) => {
                logger.log_completion(&format!("stored {} ({} bytes)", key, bytes));
                record_capture(self.prefix(), "stored", elapsed);
            }
            Err(e) => {
                logger.log_error(e.stage(), &e.to_string());
                record_capture(self.prefix(), e.stage(), elapsed);
            }
        }

        result
    }

    async fn capture(&self, now: DateTime<Utc>) -> WorkerResult<CaptureOutcome> {
        let weather = self
            .weather
            .snapshot(self.config.lat, self.config.lon)
            .await?;

        let phase = weather.phase_at(now);
        let local = weather.local(now);
        if !should_capture(&local, phase, self.config.frequency_minutes) {
            return Ok(CaptureOutcome::Skipped { phase });
        }

        let raw = self.grabber.grab().await.map_err(WorkerError::Acquisition)?;

        let overlays = Overlays::for_frame(&self.config, &weather, now);
        let annotator = self.annotator.clone();
        let png = tokio::task::spawn_blocking(move || {
            let frame = annotator.annotate(raw, &overlays)?;
            encode_png(&frame)
        })
        .await
        .map_err(|e| WorkerError::Annotation(MediaError::internal(e.to_string())))?
        .map_err(WorkerError::Annotation)?;

        let key = FrameKey::new(self.prefix(), local.naive_local(), phase, FRAME_EXTENSION);
        let object_key = key.object_key();
        let latest = latest_key(FRAME_EXTENSION);
        let options = PutOptions::public_for(&object_key);
        let bytes = png.len();

        self.store
            .put(self.prefix(), &object_key, png.clone(), &options)
            .await
            .map_err(WorkerError::Store)?;
        self.store
            .put(self.prefix(), &latest, png, &options)
            .await
            .map_err(WorkerError::Store)?;

        Ok(CaptureOutcome::Stored {
            key: object_key,
            phase,
            bytes,
        })
    }

    /// The location-local calendar day before the one containing `now`.
    pub async fn previous_local_date(&self, now: DateTime<Utc>) -> WorkerResult<NaiveDate> {
        let weather = self
            .weather
            .snapshot(self.config.lat, self.config.lon)
            .await?;
        weather
            .local_date(now)
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| WorkerError::config_error("date out of range"))
    }

    /// Assemble `date`'s frames tagged `include` and upload the video to
    /// `{prefix}_{date}/{prefix}_{date}.mp4`.
    pub async fn create_video(
        &self,
        date: NaiveDate,
        include: &[PhaseTag],
        duration_seconds: u32,
    ) -> WorkerResult<VideoUpload> {
        let logger = LocationLogger::new(self.prefix(), "timelapse");
        let started = Instant::now();

        let result = self
            .build_and_upload(date, include, duration_seconds)
            .instrument(logger.create_span())
            .await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(upload) => {
                logger.log_completion(&format!(
                    "uploaded {} ({} frames at {} fps)",
                    upload.key, upload.frame_count, upload.frame_rate
                ));
                record_timelapse(self.prefix(), true, elapsed);
            }
            Err(e) => {
                logger.log_error(e.stage(), &e.to_string());
                record_timelapse(self.prefix(), false, elapsed);
            }
        }

        result
    }

    async fn build_and_upload(
        &self,
        date: NaiveDate,
        include: &[PhaseTag],
        duration_seconds: u32,
    ) -> WorkerResult<VideoUpload> {
        let Timelapse {
            frame_count,
            frame_rate,
            video,
            ..
        } = self
            .assembler
            .assemble(self.prefix(), date, include, duration_seconds)
            .await?;

        let key = video_key(self.prefix(), date, VIDEO_EXTENSION);
        let bytes = video.len();
        self.store
            .put(self.prefix(), &key, video, &PutOptions::public_for(&key))
            .await
            .map_err(WorkerError::Upload)?;

        Ok(VideoUpload {
            key,
            frame_count,
            frame_rate,
            bytes,
        })
    }
}
