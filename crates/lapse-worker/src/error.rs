//! Worker error types.

use thiserror::Error;

use lapse_media::MediaError;
use lapse_storage::StorageError;
use lapse_weather::WeatherError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failures of a capture cycle or a timelapse job.
///
/// Every variant belongs to one pipeline stage so log lines can say where
/// a cycle stopped.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Weather provider failed: {0}")]
    Provider(#[from] WeatherError),

    #[error("Frame acquisition failed: {0}")]
    Acquisition(#[source] MediaError),

    #[error("Annotation failed: {0}")]
    Annotation(#[source] MediaError),

    #[error("Storing frame failed: {0}")]
    Store(#[source] StorageError),

    #[error("Listing frames failed: {0}")]
    List(#[source] StorageError),

    #[error("{failed} of {total} transfers failed, first error: {first}")]
    BatchTransfer {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("Timelapse assembly failed: {0}")]
    Assembly(String),

    #[error("Encoding failed: {0}")]
    Encoding(#[source] MediaError),

    #[error("Uploading timelapse failed: {0}")]
    Upload(#[source] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::ConfigError(_) => "config",
            WorkerError::Provider(_) => "weather",
            WorkerError::Acquisition(_) => "acquire",
            WorkerError::Annotation(_) => "annotate",
            WorkerError::Store(_) => "store",
            WorkerError::List(_) | WorkerError::BatchTransfer { .. } | WorkerError::Io(_) => "fetch",
            WorkerError::Assembly(_) | WorkerError::Encoding(_) => "encode",
            WorkerError::Upload(_) => "upload",
        }
    }

    /// Storage get/put/list failures.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            WorkerError::Store(_)
                | WorkerError::List(_)
                | WorkerError::BatchTransfer { .. }
                | WorkerError::Upload(_)
        )
    }

    /// No frames, no duration, or the encoder failed.
    pub fn is_assembly(&self) -> bool {
        matches!(self, WorkerError::Assembly(_) | WorkerError::Encoding(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(
            WorkerError::Provider(WeatherError::RequestFailed("503".into())).stage(),
            "weather"
        );
        assert_eq!(
            WorkerError::Acquisition(MediaError::fetch_failed("404")).stage(),
            "acquire"
        );
        assert_eq!(WorkerError::Store(StorageError::upload_failed("denied")).stage(), "store");
        assert_eq!(WorkerError::assembly("no frames").stage(), "encode");
        assert_eq!(WorkerError::Upload(StorageError::upload_failed("denied")).stage(), "upload");
    }

    #[test]
    fn test_taxonomy() {
        let batch = WorkerError::BatchTransfer {
            failed: 1,
            total: 3,
            first: "timeout".into(),
        };
        assert!(batch.is_transfer());
        assert!(!batch.is_assembly());
        assert_eq!(batch.to_string(), "1 of 3 transfers failed, first error: timeout");

        assert!(WorkerError::Encoding(MediaError::Timeout(600)).is_assembly());
        assert!(!WorkerError::config_error("x").is_transfer());
    }
}
