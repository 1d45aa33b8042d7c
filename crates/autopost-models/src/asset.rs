//! Asset tracking through the publish pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::role::BucketRole;

/// Prefix under which finished renditions are published in the destination
/// bucket. Discovery must never re-select keys below this prefix.
pub const PUBLISHED_PREFIX: &str = "published/";

/// Lifecycle state of a tracked asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    /// Listed by discovery, not yet fetched
    #[default]
    Discovered,
    /// Source file present in the download directory
    Downloaded,
    /// Rendition finalized in the output directory
    Transformed,
    /// Rendition present in the destination bucket
    Uploaded,
    /// Local files released after upload
    Cleaned,
}

/// One source media object tracked through its pipeline lifecycle.
#[derive(Debug, Clone)]
pub struct AssetRef {
    /// Source bucket role
    pub role: BucketRole,
    /// Object key in the source bucket
    pub key: String,
    /// Local path once downloaded
    pub local_path: Option<PathBuf>,
    /// Local path of the finalized rendition
    pub rendition_path: Option<PathBuf>,
    /// Destination key once uploaded
    pub destination_key: Option<String>,
    pub state: AssetState,
}

impl AssetRef {
    pub fn new(role: BucketRole, key: impl Into<String>) -> Self {
        Self {
            role,
            key: key.into(),
            local_path: None,
            rendition_path: None,
            destination_key: None,
            state: AssetState::Discovered,
        }
    }

    /// File name for the downloaded copy, unique across roles.
    ///
    /// The role prefix keeps `intro.mp4` from two source buckets from
    /// overwriting each other in the shared download directory.
    pub fn local_file_name(&self) -> String {
        format!("{}--{}", self.role.as_str(), self.key.replace(['/', '\\'], "_"))
    }

    /// Destination key for the published rendition.
    ///
    /// Deterministic in the source key: the key path is preserved below the
    /// published prefix with the extension normalized to `.mp4`, so
    /// re-publishing the same source overwrites its own prior output.
    pub fn destination_key(&self) -> String {
        let without_ext = match self.key.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => stem,
            _ => self.key.as_str(),
        };
        format!("{PUBLISHED_PREFIX}{without_ext}.mp4")
    }
}
