//! Frame and timelapse encoding configuration.

use serde::{Deserialize, Serialize};

/// Frames wider than this are downscaled (720p-class output).
pub const MAX_FRAME_WIDTH: u32 = 1280;
/// Stored frame format
pub const FRAME_EXTENSION: &str = "png";
/// Timelapse container
pub const VIDEO_EXTENSION: &str = "mp4";
/// Target timelapse length when the caller does not choose one
pub const DEFAULT_TIMELAPSE_SECONDS: u32 = 20;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 20;
/// Pixel format most players can decode
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Timelapse video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            pixel_format: default_pixel_format(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// FFmpeg output arguments for this configuration.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}
