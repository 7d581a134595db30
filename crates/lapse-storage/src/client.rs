//! DigitalOcean Spaces client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStore, PutOptions};

/// Configuration for the Spaces client.
#[derive(Debug, Clone)]
pub struct SpacesConfig {
    /// Region slug, e.g. "sfo3"
    pub region: String,
    /// Host suffix, e.g. "digitaloceanspaces.com"
    pub endpoint: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl SpacesConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            region: std::env::var("SPACES_REGION")
                .map_err(|_| StorageError::config_error("SPACES_REGION not set"))?,
            endpoint: std::env::var("SPACES_ENDPOINT")
                .unwrap_or_else(|_| "digitaloceanspaces.com".to_string()),
            access_key_id: std::env::var("SPACES_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("SPACES_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("SPACES_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("SPACES_SECRET_ACCESS_KEY not set"))?,
        })
    }

    /// S3 API endpoint: `https://{region}.{endpoint}`
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.{}", self.region, self.endpoint)
    }

    /// Public address of an object: `https://{bucket}.{region}.{endpoint}/{key}`
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "https://{}.{}.{}/{}",
            bucket,
            self.region,
            self.endpoint,
            key.trim_start_matches('/')
        )
    }
}

/// S3-compatible storage client; one bucket per location prefix.
#[derive(Clone)]
pub struct SpacesClient {
    client: Client,
    config: SpacesConfig,
}

impl SpacesClient {
    /// Create a new client from configuration.
    pub fn new(config: SpacesConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "spaces",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(SpacesConfig::from_env()?))
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        self.config.public_url(bucket, key)
    }

    /// Check that a bucket is reachable with the configured credentials.
    pub async fn check_connectivity(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::config_error(format!("Spaces connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SpacesClient {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: &PutOptions,
    ) -> StorageResult<()> {
        debug!(bucket, key, bytes = body.len(), "Uploading object");

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(&options.content_type);

        if options.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }
        if let Some(cache_control) = &options.cache_control {
            request = request.cache_control(cache_control);
        }
        if let Some(disposition) = &options.content_disposition {
            request = request.content_disposition(disposition);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}/{}: {}", bucket, key, e)))?;

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        debug!(bucket, key, "Downloading object");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(bucket, key)
                } else {
                    StorageError::download_failed(format!("{}/{}: {}", bucket, key, e))
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(format!("{}/{}: {}", bucket, key, e)))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StorageResult<Vec<String>> {
        debug!(bucket, prefix, max_keys, "Listing objects");

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        while keys.len() < max_keys {
            let page_size = (max_keys - keys.len()).min(1000) as i32;
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .max_keys(page_size);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::list_failed(format!("{}/{}: {}", bucket, prefix, e)))?;

            if let Some(ref contents) = response.contents {
                keys.extend(contents.iter().filter_map(|obj| obj.key.clone()));
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        keys.truncate(max_keys);
        info!(bucket, prefix, count = keys.len(), "Listed objects");
        Ok(keys)
    }
}
