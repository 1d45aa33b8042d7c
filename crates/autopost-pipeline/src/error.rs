//! Pipeline error types.

use thiserror::Error;

use autopost_models::{AssetRef, BucketRole};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a run before or during pipeline work.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Scratch directories could not be prepared; fatal before any network
    /// I/O happens.
    #[error("Workspace unavailable: {0}")]
    Workspace(String),

    #[error("Asset discovery failed: {0}")]
    Discovery(String),

    #[error("Selection policy failed: {0}")]
    Selection(String),

    #[error("Storage error: {0}")]
    Storage(#[from] autopost_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] autopost_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }
}

/// Pipeline stage in which a per-asset failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Download,
    Transform,
    Upload,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Download => "download",
            PipelineStage::Transform => "transform",
            PipelineStage::Upload => "upload",
        }
    }
}

/// A single asset that failed during a run.
///
/// Failures are accumulated and summarized in the run outcome body; they
/// never abort sibling assets.
#[derive(Debug, Clone)]
pub struct AssetFailure {
    pub role: BucketRole,
    pub key: String,
    pub stage: PipelineStage,
    pub reason: String,
}

impl AssetFailure {
    pub fn new(asset: &AssetRef, stage: PipelineStage, reason: impl ToString) -> Self {
        Self {
            role: asset.role,
            key: asset.key.clone(),
            stage,
            reason: reason.to_string(),
        }
    }

    /// One-line description for the outcome body.
    pub fn describe(&self) -> String {
        format!("{}/{} ({}): {}", self.role, self.key, self.stage.as_str(), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_names_asset_and_stage() {
        let asset = AssetRef::new(BucketRole::LongVideos, "clip2.mp4");
        let failure = AssetFailure::new(&asset, PipelineStage::Transform, "exit code 1");
        assert_eq!(
            failure.describe(),
            "long_videos/clip2.mp4 (transform): exit code 1"
        );
    }
}
