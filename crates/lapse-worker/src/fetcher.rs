//! Concurrent, resumable download of a day's frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use lapse_models::keys::{filename_of, sequence_filename};
use lapse_storage::{ObjectStore, StorageError};

use crate::error::{WorkerError, WorkerResult};
use crate::staging::StagingDir;

/// Outcome of one `fetch_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Objects transferred in this run
    pub fetched: usize,
    /// Objects already present locally
    pub skipped: usize,
    /// Re-indexed encoder input, in chronological order
    pub sequence: Vec<PathBuf>,
}

/// Downloads objects into a staging directory with a bounded number of
/// transfers in flight.
///
/// A local file's existence is the record that an object was fetched, so a
/// re-run after partial failure only transfers what is missing.
pub struct BatchFetcher {
    store: Arc<dyn ObjectStore>,
    max_parallel: usize,
    settle_delay: Duration,
}

impl BatchFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, max_parallel: usize, settle_delay: Duration) -> Self {
        Self {
            store,
            max_parallel: max_parallel.max(1),
            settle_delay,
        }
    }

    /// Fetch `keys` from `bucket` into `staging`, then rebuild the numbered
    /// sequence from the full sorted key list.
    ///
    /// Every transfer is attempted before failures are reported; staged
    /// files are left in place on error so the next run can resume.
    pub async fn fetch_all(
        &self,
        bucket: &str,
        keys: &[String],
        staging: &StagingDir,
    ) -> WorkerResult<FetchReport> {
        staging.ensure().await?;

        let mut sorted: Vec<String> = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut pending = Vec::new();
        for key in &sorted {
            let path = staging.frame_path(filename_of(key));
            if !tokio::fs::try_exists(&path).await? {
                pending.push((key.clone(), path));
            }
        }
        let skipped = sorted.len() - pending.len();

        debug!(
            bucket,
            total = sorted.len(),
            pending = pending.len(),
            skipped,
            "Starting batch fetch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let transfers = pending.iter().map(|(key, path)| {
            let semaphore = Arc::clone(&semaphore);
            let store = Arc::clone(&self.store);
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| StorageError::download_failed("transfer pool closed"))?;
                let body = store.get(bucket, key).await?;
                write_atomic(path, &body).await?;
                Ok::<_, StorageError>(())
            }
        });

        let results = join_all(transfers).await;

        let failures: Vec<(&String, StorageError)> = pending
            .iter()
            .zip(results)
            .filter_map(|((key, _), result)| result.err().map(|e| (key, e)))
            .collect();

        if let Some((key, first)) = failures.first() {
            for (key, error) in &failures {
                warn!(bucket, key = %key, error = %error, "Frame transfer failed");
            }
            return Err(WorkerError::BatchTransfer {
                failed: failures.len(),
                total: pending.len(),
                first: format!("{}: {}", key, first),
            });
        }

        // let the backing filesystem catch up before renaming
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let sequence = reindex(staging, &sorted).await?;

        info!(
            bucket,
            fetched = pending.len(),
            skipped,
            frames = sequence.len(),
            "Batch fetch complete"
        );

        Ok(FetchReport {
            fetched: pending.len(),
            skipped,
            sequence,
        })
    }
}

/// Write to a sibling temp file and rename, so a half-written frame never
/// counts as already fetched.
async fn write_atomic(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await
}

/// Link every frame, in key order, to `sequence/image-NNN.{ext}`.
async fn reindex(staging: &StagingDir, sorted_keys: &[String]) -> WorkerResult<Vec<PathBuf>> {
    staging.reset_sequence().await?;

    let mut sequence = Vec::with_capacity(sorted_keys.len());
    for (index, key) in sorted_keys.iter().enumerate() {
        let filename = filename_of(key);
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("png");
        let source = staging.frame_path(filename);
        let target = staging.sequence_dir().join(sequence_filename(index, extension));

        link_or_copy(&source, &target).await?;
        sequence.push(target);
    }

    Ok(sequence)
}

async fn link_or_copy(source: &Path, target: &Path) -> std::io::Result<()> {
    match tokio::fs::hard_link(source, target).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(source = %source.display(), error = %e, "Hard link failed, copying");
            tokio::fs::copy(source, target).await.map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lapse_storage::MemoryStore;

    fn keys() -> Vec<String> {
        vec![
            "moab_2024-06-01/moab_2024-06-01_12-00-00_day.png".to_string(),
            "moab_2024-06-01/moab_2024-06-01_06-05-00_sunrise.png".to_string(),
            "moab_2024-06-01/moab_2024-06-01_20-30-00_sunset.png".to_string(),
        ]
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for key in keys() {
            store.insert("moab", &key, key.as_bytes().to_vec());
        }
        store
    }

    fn staging(work: &tempfile::TempDir) -> StagingDir {
        StagingDir::new(work.path(), "moab", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_and_reindex_in_key_order() {
        let work = tempfile::TempDir::new().unwrap();
        let store = seeded_store();
        let fetcher = BatchFetcher::new(store.clone(), 2, Duration::ZERO);

        let report = fetcher.fetch_all("moab", &keys(), &staging(&work)).await.unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.get_count(), 3);

        let contents: Vec<String> = report
            .sequence
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        let mut expected = keys();
        expected.sort();
        assert_eq!(contents, expected);
        assert!(report.sequence[0].ends_with("sequence/image-000.png"));
        assert!(report.sequence[2].ends_with("sequence/image-002.png"));
    }

    #[tokio::test]
    async fn test_rerun_transfers_nothing() {
        let work = tempfile::TempDir::new().unwrap();
        let store = seeded_store();
        let fetcher = BatchFetcher::new(store.clone(), 20, Duration::ZERO);
        let staging = staging(&work);

        fetcher.fetch_all("moab", &keys(), &staging).await.unwrap();
        let before = store.get_count();

        let report = fetcher.fetch_all("moab", &keys(), &staging).await.unwrap();

        assert_eq!(store.get_count(), before);
        assert_eq!(report.fetched, 0);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.sequence.len(), 3);
        assert_eq!(
            std::fs::read_to_string(&report.sequence[0]).unwrap(),
            "moab_2024-06-01/moab_2024-06-01_06-05-00_sunrise.png"
        );
    }

    #[tokio::test]
    async fn test_failures_are_collected_and_resumable() {
        let work = tempfile::TempDir::new().unwrap();
        let store = seeded_store();
        let fetcher = BatchFetcher::new(store.clone(), 1, Duration::ZERO);
        let staging = staging(&work);
        let broken = "moab_2024-06-01/moab_2024-06-01_12-00-00_day.png";

        store.fail_gets_for(broken);
        let err = fetcher.fetch_all("moab", &keys(), &staging).await.unwrap_err();

        match err {
            WorkerError::BatchTransfer { failed, total, .. } => {
                assert_eq!((failed, total), (1, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
        // the healthy transfers still completed and stay staged
        assert_eq!(store.get_count(), 3);
        assert!(staging.frame_path("moab_2024-06-01_06-05-00_sunrise.png").exists());
        assert!(!staging.frame_path("moab_2024-06-01_12-00-00_day.png").exists());

        store.clear_failures();
        let report = fetcher.fetch_all("moab", &keys(), &staging).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(store.get_count(), 4);
    }

    #[tokio::test]
    async fn test_stale_sequence_entries_are_dropped() {
        let work = tempfile::TempDir::new().unwrap();
        let store = seeded_store();
        let fetcher = BatchFetcher::new(store, 4, Duration::ZERO);
        let staging = staging(&work);

        fetcher.fetch_all("moab", &keys(), &staging).await.unwrap();
        let report = fetcher.fetch_all("moab", &keys()[..1], &staging).await.unwrap();

        assert_eq!(report.sequence.len(), 1);
        assert_eq!(std::fs::read_dir(staging.sequence_dir()).unwrap().count(), 1);
    }
}
