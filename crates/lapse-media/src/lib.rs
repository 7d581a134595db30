//! Frame acquisition, annotation and timelapse encoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress parsing and timeouts
//! - HTTP and RTSP single-frame grabbers selected by URL scheme
//! - Frame resizing and translucent text overlays
//! - Image-sequence to video encoding

pub mod annotate;
pub mod command;
pub mod error;
pub mod grab;
pub mod progress;
pub mod timelapse;

pub use annotate::{encode_png, format_timestamp, resize_to_width, Annotator, OverlayLayout, Overlays};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use grab::{grabber_for, FrameGrabber, HttpGrabber, RtspGrabber};
pub use progress::FfmpegProgress;
pub use timelapse::{EncodeRequest, FfmpegEncoder, VideoEncoder};
