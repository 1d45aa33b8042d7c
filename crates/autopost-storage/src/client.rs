//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use autopost_models::BucketRole;

use crate::config::{BucketRoleConfig, S3Config};
use crate::error::{StorageError, StorageResult};

/// Information about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object storage operations, keyed by logical bucket role.
///
/// The pipeline is written against this trait so tests can substitute an
/// in-memory implementation for the real S3 client.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List objects in the role's bucket under a key prefix.
    async fn list_objects(&self, role: BucketRole, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Download an object to a local file, creating parent directories.
    async fn download_file(&self, role: BucketRole, key: &str, path: &Path) -> StorageResult<()>;

    /// Download an object into memory.
    async fn download_bytes(&self, role: BucketRole, key: &str) -> StorageResult<Vec<u8>>;

    /// Upload a local file under the given key.
    async fn upload_file(
        &self,
        role: BucketRole,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Verify the configured buckets are reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// S3-compatible storage client with role-based bucket resolution.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    buckets: BucketRoleConfig,
}

impl S3Client {
    /// Create a new client from configuration.
    pub async fn new(config: S3Config, buckets: BucketRoleConfig) -> StorageResult<Self> {
        let base = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = Builder::from(&base);

        if let Some(region) = config.region {
            builder = builder.region(Region::new(region));
        }
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .credentials_provider(Credentials::new(id, secret, None, None, "autopost"));
        }

        let client = Client::from_conf(builder.build());

        Ok(Self { client, buckets })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let buckets = BucketRoleConfig::from_env()?;
        Self::new(S3Config::from_env(), buckets).await
    }

    fn bucket(&self, role: BucketRole) -> &str {
        self.buckets.bucket_for(role)
    }
}

#[async_trait]
impl ObjectStorage for S3Client {
    async fn list_objects(&self, role: BucketRole, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let bucket = self.bucket(role);
        debug!(role = %role, bucket = %bucket, prefix = %prefix, "Listing objects");

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;

            if let Some(ref contents) = response.contents {
                for obj in contents {
                    objects.push(ObjectInfo {
                        key: obj.key.clone().unwrap_or_default(),
                        size: obj.size.unwrap_or(0) as u64,
                        last_modified: obj
                            .last_modified
                            .as_ref()
                            .and_then(|t| t.to_millis().ok())
                            .and_then(DateTime::<Utc>::from_timestamp_millis),
                    });
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn download_file(&self, role: BucketRole, key: &str, path: &Path) -> StorageResult<()> {
        let bytes = self.download_bytes(role, key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::download_failed(format!("failed to create directory: {e}"))
            })?;
        }

        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::download_failed(format!("failed to write file: {e}")))?;

        info!(role = %role, key = %key, "Downloaded object to {}", path.display());
        Ok(())
    }

    async fn download_bytes(&self, role: BucketRole, key: &str) -> StorageResult<Vec<u8>> {
        let bucket = self.bucket(role);
        debug!(role = %role, bucket = %bucket, key = %key, "Downloading object");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn upload_file(
        &self,
        role: BucketRole,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let bucket = self.bucket(role);
        debug!(role = %role, bucket = %bucket, key = %key, "Uploading {}", path.display());

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!(role = %role, key = %key, "Uploaded {}", path.display());
        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        for role in BucketRole::ALL {
            self.client
                .head_bucket()
                .bucket(self.bucket(role))
                .send()
                .await
                .map_err(|e| {
                    StorageError::AwsSdk(format!("bucket for role {role} unreachable: {e}"))
                })?;
        }
        Ok(())
    }
}
