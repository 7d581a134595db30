//! Per-(location, date) staging directory for timelapse jobs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use lapse_models::keys::date_folder;

/// `{work_dir}/{prefix}_{date}` holding `frames/` (downloaded originals,
/// the dedup source of truth) and `sequence/` (re-indexed encoder input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(work_dir: &Path, prefix: &str, date: NaiveDate) -> Self {
        Self {
            root: work_dir.join(date_folder(prefix, date)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn sequence_dir(&self) -> PathBuf {
        self.root.join("sequence")
    }

    pub fn frame_path(&self, filename: &str) -> PathBuf {
        self.frames_dir().join(filename)
    }

    /// Create the directory tree; existing content is kept.
    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.frames_dir()).await?;
        tokio::fs::create_dir_all(self.sequence_dir()).await
    }

    /// Empty `sequence/` so it can be rebuilt from scratch.
    pub async fn reset_sequence(&self) -> std::io::Result<()> {
        let dir = self.sequence_dir();
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&dir).await
    }

    /// Delete the whole staging tree. Failures are logged, not returned.
    pub async fn remove(&self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(path = %self.root.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.root.display(), error = %e, "Failed to remove staging directory"),
        }
    }
}
