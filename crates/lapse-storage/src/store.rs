//! Object store port.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Headers attached to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub cache_control: Option<String>,
    pub public_read: bool,
    pub content_disposition: Option<String>,
}

impl PutOptions {
    /// Publicly readable, displayed inline and never cached.
    ///
    /// Frame keys, the `latest` alias and the day's video all use this.
    pub fn public(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: Some("max-age=0".to_string()),
            public_read: true,
            content_disposition: Some("inline".to_string()),
        }
    }

    /// Public upload with the MIME type inferred from `filename`.
    pub fn public_for(filename: &str) -> Self {
        Self::public(content_type_for(filename))
    }
}

/// Bucket-per-location object store.
///
/// `put` must be atomic per key: readers see either the old object or the
/// complete new one.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> StorageResult<()>;

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Keys under `prefix`, complete up to `max_keys`.
    async fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StorageResult<Vec<String>>;
}

/// MIME type from a filename extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
