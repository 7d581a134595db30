//! Single-frame acquisition from camera sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use lapse_models::{LocationConfig, SourceKind};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Pulls one raw frame from a camera.
///
/// Implementations do not retry; a failed grab abandons the capture cycle.
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    async fn grab(&self) -> MediaResult<DynamicImage>;
}

/// Fetches a still image with a single HTTP(S) GET.
pub struct HttpGrabber {
    url: String,
    http: reqwest::Client,
}

impl HttpGrabber {
    pub fn new(url: impl Into<String>, timeout: Duration) -> MediaResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl FrameGrabber for HttpGrabber {
    async fn grab(&self) -> MediaResult<DynamicImage> {
        debug!(url = %self.url, "Fetching snapshot");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::fetch_failed(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let bytes = response.bytes().await?;
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| MediaError::internal(format!("decode task failed: {}", e)))??;

        Ok(image)
    }
}

/// Extracts exactly one frame from an RTSP stream through FFmpeg.
///
/// The frame goes through a scratch file named after the location prefix,
/// so concurrent locations never share a path.
pub struct RtspGrabber {
    url: String,
    scratch_path: PathBuf,
    runner: FfmpegRunner,
}

impl RtspGrabber {
    pub fn new(url: impl Into<String>, scratch_dir: &Path, prefix: &str, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            scratch_path: scratch_dir.join(format!("{}.png", prefix)),
            runner: FfmpegRunner::new().with_timeout(timeout.as_secs().max(1)),
        }
    }

    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    fn command(&self) -> FfmpegCommand {
        FfmpegCommand::new(self.url.clone(), &self.scratch_path)
            .rtsp_over_tcp()
            .single_frame()
    }
}

#[async_trait]
impl FrameGrabber for RtspGrabber {
    async fn grab(&self) -> MediaResult<DynamicImage> {
        // a stale frame from an earlier cycle must never be read back
        remove_if_exists(&self.scratch_path).await?;

        if let Some(parent) = self.scratch_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(url = %self.url, path = %self.scratch_path.display(), "Extracting RTSP frame");
        self.runner.run(&self.command()).await?;

        if !tokio::fs::try_exists(&self.scratch_path).await? {
            return Err(MediaError::FileNotFound(self.scratch_path.clone()));
        }

        let bytes = tokio::fs::read(&self.scratch_path).await?;
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| MediaError::internal(format!("decode task failed: {}", e)))??;

        Ok(image)
    }
}

async fn remove_if_exists(path: &Path) -> MediaResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Pick the grabber implied by the resource URL scheme.
pub fn grabber_for(
    config: &LocationConfig,
    scratch_dir: &Path,
    timeout: Duration,
) -> MediaResult<Arc<dyn FrameGrabber>> {
    let kind = config
        .source_kind()
        .map_err(|e| MediaError::UnsupportedSource(e.to_string()))?;

    let grabber: Arc<dyn FrameGrabber> = match kind {
        SourceKind::Http => Arc::new(HttpGrabber::new(config.resource_url.clone(), timeout)?),
        SourceKind::Rtsp => Arc::new(RtspGrabber::new(
            config.resource_url.clone(),
            scratch_dir,
            &config.prefix,
            timeout,
        )),
    };
    Ok(grabber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_http_grab_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snap.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(64, 48)))
            .expect(1)
            .mount(&server)
            .await;

        let grabber = HttpGrabber::new(format!("{}/snap.jpg", server.uri()), Duration::from_secs(5)).unwrap();
        let image = grabber.grab().await.unwrap();

        assert_eq!((image.width(), image.height()), (64, 48));
    }

    #[tokio::test]
    async fn test_http_grab_rejects_errors_and_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let missing = HttpGrabber::new(format!("{}/missing.jpg", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(matches!(missing.grab().await, Err(MediaError::FetchFailed { .. })));

        let garbage = HttpGrabber::new(format!("{}/garbage.jpg", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(matches!(garbage.grab().await, Err(MediaError::Decode(_))));
    }

    #[test]
    fn test_rtsp_scratch_path_is_per_prefix() {
        let dir = tempfile::TempDir::new().unwrap();
        let grabber = RtspGrabber::new("rtsp://10.0.0.3/stream", dir.path(), "moab", Duration::from_secs(30));

        assert_eq!(grabber.scratch_path(), dir.path().join("moab.png"));
        let args = grabber.command().build_args();
        assert!(args.windows(2).any(|w| w == ["-rtsp_transport", "tcp"]));
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert!(args.windows(2).any(|w| w == ["-vsync", "0"]));
    }

    #[tokio::test]
    async fn test_stale_scratch_file_is_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let stale = dir.path().join("moab.png");
        std::fs::write(&stale, b"old frame").unwrap();

        remove_if_exists(&stale).await.unwrap();
        assert!(!stale.exists());
        // second removal of a missing file is fine
        remove_if_exists(&stale).await.unwrap();
    }

    #[tokio::test]
    async fn test_rtsp_grab_never_returns_previous_frame() {
        let dir = tempfile::TempDir::new().unwrap();
        let grabber = RtspGrabber::new(
            "rtsp://127.0.0.1:9/unreachable",
            dir.path(),
            "moab",
            Duration::from_secs(2),
        );
        // a decodable frame left over from an earlier cycle
        let stale = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])));
        stale.save_with_format(grabber.scratch_path(), ImageFormat::Png).unwrap();

        // with or without FFmpeg installed nothing can be extracted here
        let result = grabber.grab().await;

        assert!(result.is_err(), "stale scratch frame was returned");
        assert!(!grabber.scratch_path().exists());
    }

    #[test]
    fn test_grabber_for_rejects_unknown_scheme() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LocationConfig::new("ftp://10.0.0.4/a.jpg", 0.0, 0.0, "cam3");
        assert!(matches!(
            grabber_for(&config, dir.path(), Duration::from_secs(5)),
            Err(MediaError::UnsupportedSource(_))
        ));
    }
}
