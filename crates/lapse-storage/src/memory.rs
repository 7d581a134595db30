//! In-memory object store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStore, PutOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    options: PutOptions,
}

/// Process-local [`ObjectStore`] used by tests and dry runs.
///
/// Keys are kept sorted per bucket, like an S3 listing. Every `get` is
/// counted so callers can assert how many transfers actually happened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, StoredObject>>>,
    gets: AtomicUsize,
    failing: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, bypassing the put path.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let object = StoredObject {
            body: body.into(),
            options: PutOptions::public_for(key),
        };
        self.lock_buckets()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    /// Make every `get` of `key` fail until cleared.
    pub fn fail_gets_for(&self, key: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of `get` calls served (including failed ones).
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock_buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone())
    }

    pub fn options(&self, bucket: &str, key: &str) -> Option<PutOptions> {
        self.lock_buckets()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.options.clone())
    }

    /// All keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock_buckets()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock_buckets(&self) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, StoredObject>>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> StorageResult<()> {
        let object = StoredObject {
            body,
            options: options.clone(),
        };
        self.lock_buckets()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|k| k == key);
        if failing {
            return Err(StorageError::download_failed(format!(
                "{}/{}: injected failure",
                bucket, key
            )));
        }

        self.object(bucket, key)
            .ok_or_else(|| StorageError::not_found(bucket, key))
    }

    async fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StorageResult<Vec<String>> {
        Ok(self
            .lock_buckets()
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .take(max_keys)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list() {
        let store = MemoryStore::new();
        store
            .put("moab", "latest.png", b"img".to_vec(), &PutOptions::public("image/png"))
            .await
            .unwrap();
        store.insert("moab", "moab_2024-06-01/b.png", b"b".to_vec());
        store.insert("moab", "moab_2024-06-01/a.png", b"a".to_vec());
        store.insert("moab", "moab_2024-06-02/c.png", b"c".to_vec());

        assert_eq!(store.get("moab", "latest.png").await.unwrap(), b"img");
        assert_eq!(store.get_count(), 1);

        let listed = store.list("moab", "moab_2024-06-01/", 3000).await.unwrap();
        assert_eq!(listed, vec!["moab_2024-06-01/a.png", "moab_2024-06-01/b.png"]);

        let capped = store.list("moab", "moab_", 2).await.unwrap();
        assert_eq!(capped.len(), 2);

        assert!(store.list("other", "", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_injected_failures() {
        let store = MemoryStore::new();
        store.insert("moab", "a.png", b"a".to_vec());

        assert!(matches!(
            store.get("moab", "nope.png").await,
            Err(StorageError::NotFound { .. })
        ));

        store.fail_gets_for("a.png");
        assert!(matches!(
            store.get("moab", "a.png").await,
            Err(StorageError::DownloadFailed(_))
        ));

        store.clear_failures();
        assert!(store.get("moab", "a.png").await.is_ok());
        assert_eq!(store.get_count(), 3);
    }
}
