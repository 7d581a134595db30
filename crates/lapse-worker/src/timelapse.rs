//! Timelapse assembly for one location and date.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::info;

use lapse_media::{EncodeRequest, VideoEncoder};
use lapse_models::encoding::{FRAME_EXTENSION, VIDEO_EXTENSION};
use lapse_models::keys::{date_list_prefix, video_filename};
use lapse_models::{FrameKey, PhaseTag};
use lapse_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};
use crate::fetcher::BatchFetcher;
use crate::logging::LocationLogger;
use crate::metrics::record_fetch;
use crate::staging::StagingDir;

/// Frames per second that spreads `frame_count` frames over `duration_seconds`.
///
/// Integer division; the output length is fixed and the rate adapts. A
/// result of 0 (fewer frames than seconds) is raised to 1.
pub fn frame_rate(frame_count: usize, duration_seconds: u32) -> WorkerResult<u32> {
    if duration_seconds == 0 {
        return Err(WorkerError::assembly("timelapse duration must be positive"));
    }
    if frame_count == 0 {
        return Err(WorkerError::assembly("no frames to assemble"));
    }

    let rate = frame_count / duration_seconds as usize;
    Ok(u32::try_from(rate).unwrap_or(u32::MAX).max(1))
}

/// Keys of frames whose phase tag is in `include`, sorted chronologically.
///
/// Keys that are not frames (e.g. the day's video) are dropped.
pub fn select_frames(keys: &[String], include: &[PhaseTag]) -> Vec<String> {
    let mut selected: Vec<String> = keys
        .iter()
        .filter(|key| {
            FrameKey::parse(key)
                .map(|frame| include.contains(&frame.phase))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    selected.sort();
    selected
}

/// Encoded timelapse, ready for upload.
#[derive(Debug, Clone)]
pub struct Timelapse {
    pub date: NaiveDate,
    pub frame_count: usize,
    pub frame_rate: u32,
    pub video: Vec<u8>,
}

/// Lists, fetches and encodes a day's frames.
pub struct TimelapseAssembler {
    store: Arc<dyn ObjectStore>,
    fetcher: BatchFetcher,
    encoder: Arc<dyn VideoEncoder>,
    work_dir: PathBuf,
    max_list_keys: usize,
}

impl TimelapseAssembler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: BatchFetcher,
        encoder: Arc<dyn VideoEncoder>,
        work_dir: PathBuf,
        max_list_keys: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            encoder,
            work_dir,
            max_list_keys,
        }
    }

    pub fn staging_dir(&self, prefix: &str, date: NaiveDate) -> StagingDir {
        StagingDir::new(&self.work_dir, prefix, date)
    }

    /// Build the timelapse for `prefix` on `date` from frames tagged `include`.
    ///
    /// If fetching fails the staged frames are kept for a resumed run. Once
    /// fetching succeeds the staging directory is removed whatever the
    /// encoder does.
    pub async fn assemble(
        &self,
        prefix: &str,
        date: NaiveDate,
        include: &[PhaseTag],
        duration_seconds: u32,
    ) -> WorkerResult<Timelapse> {
        let logger = LocationLogger::new(prefix, "timelapse");
        let started = Instant::now();

        if duration_seconds == 0 {
            return Err(WorkerError::assembly("timelapse duration must be positive"));
        }

        let listed = self
            .store
            .list(prefix, &date_list_prefix(prefix, date), self.max_list_keys)
            .await
            .map_err(WorkerError::List)?;
        let selected = select_frames(&listed, include);
        let rate = frame_rate(selected.len(), duration_seconds)?;

        logger.log_start(&format!(
            "{} of {} objects selected for {} at {} fps",
            selected.len(),
            listed.len(),
            date,
            rate
        ));

        if selected.len() < duration_seconds as usize {
            logger.log_warning(&format!(
                "only {} frames for a {}s timelapse, encoding at 1 fps",
                selected.len(),
                duration_seconds
            ));
        }

        let staging = self.staging_dir(prefix, date);
        let report = self.fetcher.fetch_all(prefix, &selected, &staging).await?;
        record_fetch(prefix, report.fetched, report.skipped);
        logger.log_progress(&format!(
            "{} frames staged ({} fetched, {} already local)",
            report.sequence.len(),
            report.fetched,
            report.skipped
        ));

        let output = staging.root().join(video_filename(prefix, date, VIDEO_EXTENSION));
        let request = EncodeRequest {
            sequence_dir: staging.sequence_dir(),
            extension: FRAME_EXTENSION.to_string(),
            frame_rate: rate,
            frame_count: report.sequence.len(),
            output: output.clone(),
        };

        let encoded = match self.encoder.encode(&request).await {
            Ok(()) => tokio::fs::read(&output).await.map_err(WorkerError::from),
            Err(e) => Err(WorkerError::Encoding(e)),
        };
        staging.remove().await;
        let video = encoded?;

        info!(
            prefix,
            date = %date,
            frames = report.sequence.len(),
            fps = rate,
            bytes = video.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Timelapse assembled"
        );

        Ok(Timelapse {
            date,
            frame_count: report.sequence.len(),
            frame_rate: rate,
            video,
        })
    }
}
