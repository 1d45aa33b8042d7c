//! Storage configuration.

use autopost_models::BucketRole;

use crate::error::{StorageError, StorageResult};

/// Mapping from logical bucket role to physical bucket name.
///
/// Loaded once at process start and immutable for the process lifetime. A
/// missing role mapping is a fatal configuration error: the service refuses
/// to start rather than discovering the gap mid-run.
#[derive(Debug, Clone)]
pub struct BucketRoleConfig {
    assets: String,
    long_videos: String,
    shorts_reels: String,
    config: String,
}

impl BucketRoleConfig {
    pub fn new(
        assets: impl Into<String>,
        long_videos: impl Into<String>,
        shorts_reels: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Self {
            assets: assets.into(),
            long_videos: long_videos.into(),
            shorts_reels: shorts_reels.into(),
            config: config.into(),
        }
    }

    /// Resolve all role mappings from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            assets: require("AUTOPOST_ASSETS_BUCKET")?,
            long_videos: require("AUTOPOST_LONG_VIDEOS_BUCKET")?,
            shorts_reels: require("AUTOPOST_SHORTS_REELS_BUCKET")?,
            config: require("AUTOPOST_CONFIG_BUCKET")?,
        })
    }

    /// Physical bucket name for a logical role.
    pub fn bucket_for(&self, role: BucketRole) -> &str {
        match role {
            BucketRole::Assets => &self.assets,
            BucketRole::LongVideos => &self.long_videos,
            BucketRole::ShortsReels => &self.shorts_reels,
            BucketRole::Config => &self.config,
        }
    }
}

fn require(var: &str) -> StorageResult<String> {
    std::env::var(var).map_err(|_| StorageError::config_error(format!("{var} not set")))
}

/// Connection settings for the S3 API.
///
/// All fields are optional: with nothing set, the default AWS provider
/// chain and region resolution apply. The endpoint override makes the same
/// client work against R2/MinIO-style S3-compatible services.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Custom S3 API endpoint (path-style addressing is forced when set)
    pub endpoint_url: Option<String>,
    /// Region override
    pub region: Option<String>,
    /// Explicit access key; falls back to the default provider chain
    pub access_key_id: Option<String>,
    /// Explicit secret key; falls back to the default provider chain
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("AUTOPOST_S3_ENDPOINT_URL").ok(),
            region: std::env::var("AUTOPOST_S3_REGION").ok(),
            access_key_id: std::env::var("AUTOPOST_S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AUTOPOST_S3_SECRET_ACCESS_KEY").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_resolution_covers_all_roles() {
        let config = BucketRoleConfig::new("static", "longs", "shorts", "static");
        assert_eq!(config.bucket_for(BucketRole::Assets), "static");
        assert_eq!(config.bucket_for(BucketRole::LongVideos), "longs");
        assert_eq!(config.bucket_for(BucketRole::ShortsReels), "shorts");
        assert_eq!(config.bucket_for(BucketRole::Config), "static");
    }

    #[test]
    fn test_missing_role_mapping_is_a_config_error() {
        // The test environment does not define the autopost bucket variables.
        let result = BucketRoleConfig::from_env();
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
