//! Image-sequence to video encoding.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use lapse_models::keys::sequence_pattern;
use lapse_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// One encode of a gap-free `image-%03d.{ext}` sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Directory holding the numbered sequence
    pub sequence_dir: PathBuf,
    /// Extension of the sequence files
    pub extension: String,
    pub frame_rate: u32,
    pub frame_count: usize,
    pub output: PathBuf,
}

impl EncodeRequest {
    /// FFmpeg input pattern inside `sequence_dir`.
    pub fn input_pattern(&self) -> String {
        self.sequence_dir
            .join(sequence_pattern(&self.extension))
            .to_string_lossy()
            .to_string()
    }
}

/// Turns a numbered image sequence into one video file.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, request: &EncodeRequest) -> MediaResult<()>;
}

/// [`VideoEncoder`] backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    pub fn command(&self, request: &EncodeRequest) -> FfmpegCommand {
        FfmpegCommand::new(request.input_pattern(), &request.output)
            .framerate(request.frame_rate)
            .input_arg("-pattern_type")
            .input_arg("sequence")
            .output_args(self.encoding.to_ffmpeg_args())
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> MediaResult<()> {
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let total = request.frame_count as u64;
        let output = display_name(&request.output);

        self.runner
            .run_with_progress(&self.command(request), move |progress| {
                debug!(
                    output = %output,
                    frame = progress.frame,
                    percent = progress.frame_percentage(total),
                    "Encoding timelapse"
                );
            })
            .await?;

        info!(
            output = %request.output.display(),
            frames = request.frame_count,
            fps = request.frame_rate,
            "Timelapse encoded"
        );
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
