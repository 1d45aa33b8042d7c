//! Asset eligibility policies.
//!
//! Which objects a run picks up is a product decision, so the rule is
//! pluggable. Two policies ship here: the default takes everything modified
//! since the previous run; the manifest policy publishes exactly the keys
//! named by a JSON document in the config bucket, which also covers
//! deliberate reprocessing.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use autopost_models::{BucketRole, PUBLISHED_PREFIX};
use autopost_storage::{ObjectInfo, ObjectStorage};

use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::RunContext;

/// Extensions recognized as source video material.
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "webm"];

/// Decides which listed objects are eligible for this run.
#[async_trait]
pub trait SelectionPolicy: Send + Sync {
    async fn select(
        &self,
        storage: &dyn ObjectStorage,
        role: BucketRole,
        objects: Vec<ObjectInfo>,
        ctx: &RunContext,
    ) -> PipelineResult<Vec<ObjectInfo>>;
}

/// True for keys that can be source material: a video extension, outside
/// the published prefix.
fn is_source_video(key: &str) -> bool {
    if key.starts_with(PUBLISHED_PREFIX) {
        return false;
    }
    match key.rsplit_once('.') {
        Some((_, ext)) => VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Default policy: everything modified after the previous run.
///
/// On the first run (no previous run recorded) every source object is
/// eligible. Objects without a modification timestamp are included rather
/// than silently skipped.
#[derive(Debug, Default, Clone)]
pub struct NewSinceLastRun;

#[async_trait]
impl SelectionPolicy for NewSinceLastRun {
    async fn select(
        &self,
        _storage: &dyn ObjectStorage,
        role: BucketRole,
        objects: Vec<ObjectInfo>,
        ctx: &RunContext,
    ) -> PipelineResult<Vec<ObjectInfo>> {
        let cutoff = ctx.last_run;
        let selected: Vec<ObjectInfo> = objects
            .into_iter()
            .filter(|o| is_source_video(&o.key))
            .filter(|o| match (cutoff, o.last_modified) {
                (Some(cutoff), Some(modified)) => modified > cutoff,
                _ => true,
            })
            .collect();

        debug!(role = %role, count = selected.len(), "Selected new assets");
        Ok(selected)
    }
}

/// Manifest document stored in the config bucket.
#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    long_videos: Vec<String>,
    #[serde(default)]
    shorts_reels: Vec<String>,
}

/// Publishes exactly the keys named by a manifest in the config bucket.
///
/// Re-running the same manifest reprocesses the same assets to the same
/// destination keys.
#[derive(Debug, Clone)]
pub struct ManifestPolicy {
    manifest_key: String,
}

impl ManifestPolicy {
    pub fn new(manifest_key: impl Into<String>) -> Self {
        Self {
            manifest_key: manifest_key.into(),
        }
    }
}

#[async_trait]
impl SelectionPolicy for ManifestPolicy {
    async fn select(
        &self,
        storage: &dyn ObjectStorage,
        role: BucketRole,
        objects: Vec<ObjectInfo>,
        _ctx: &RunContext,
    ) -> PipelineResult<Vec<ObjectInfo>> {
        // The manifest is a small document; fetching it per source role
        // keeps this policy stateless.
        let bytes = storage
            .download_bytes(BucketRole::Config, &self.manifest_key)
            .await
            .map_err(|e| {
                PipelineError::selection(format!(
                    "failed to fetch manifest {}: {e}",
                    self.manifest_key
                ))
            })?;

        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
            PipelineError::selection(format!("invalid manifest {}: {e}", self.manifest_key))
        })?;

        let wanted = match role {
            BucketRole::LongVideos => &manifest.long_videos,
            BucketRole::ShortsReels => &manifest.shorts_reels,
            _ => return Ok(Vec::new()),
        };

        let selected: Vec<ObjectInfo> = objects
            .into_iter()
            .filter(|o| wanted.iter().any(|k| k == &o.key))
            .collect();

        debug!(role = %role, count = selected.len(), "Selected manifest assets");
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopost_models::{RunId, RunTrigger};
    use autopost_storage::{StorageError, StorageResult};
    use chrono::{Duration, Utc};
    use std::path::Path;

    fn ctx(last_run: Option<chrono::DateTime<Utc>>) -> RunContext {
        RunContext {
            run_id: RunId::new(),
            trigger: RunTrigger::Scheduled,
            last_run,
        }
    }

    fn object(key: &str, modified_mins_ago: i64) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size: 1024,
            last_modified: Some(Utc::now() - Duration::minutes(modified_mins_ago)),
        }
    }

    /// Storage stub that only serves the manifest document.
    struct ManifestOnlyStorage {
        manifest: Vec<u8>,
    }

    #[async_trait]
    impl ObjectStorage for ManifestOnlyStorage {
        async fn list_objects(
            &self,
            _role: BucketRole,
            _prefix: &str,
        ) -> StorageResult<Vec<ObjectInfo>> {
            Ok(Vec::new())
        }

        async fn download_file(
            &self,
            _role: BucketRole,
            key: &str,
            _path: &Path,
        ) -> StorageResult<()> {
            Err(StorageError::not_found(key))
        }

        async fn download_bytes(&self, role: BucketRole, _key: &str) -> StorageResult<Vec<u8>> {
            assert_eq!(role, BucketRole::Config);
            Ok(self.manifest.clone())
        }

        async fn upload_file(
            &self,
            _role: BucketRole,
            _path: &Path,
            key: &str,
            _content_type: &str,
        ) -> StorageResult<()> {
            Err(StorageError::upload_failed(key))
        }

        async fn check_connectivity(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_is_source_video() {
        assert!(is_source_video("clip.mp4"));
        assert!(is_source_video("batch/clip.MOV"));
        assert!(!is_source_video("published/clip.mp4"));
        assert!(!is_source_video("titles.json"));
        assert!(!is_source_video("no-extension"));
    }

    #[tokio::test]
    async fn test_new_since_last_run_takes_everything_on_first_run() {
        let storage = ManifestOnlyStorage { manifest: vec![] };
        let objects = vec![object("a.mp4", 600), object("b.mp4", 5)];

        let selected = NewSinceLastRun
            .select(&storage, BucketRole::LongVideos, objects, &ctx(None))
            .await
            .unwrap();

        assert_eq!(selected.len(), 2);
    }

    #[tokio::test]
    async fn test_new_since_last_run_applies_cutoff() {
        let storage = ManifestOnlyStorage { manifest: vec![] };
        let last_run = Utc::now() - Duration::minutes(60);
        let objects = vec![
            object("old.mp4", 600),
            object("fresh.mp4", 5),
            object("published/done.mp4", 5),
        ];

        let selected = NewSinceLastRun
            .select(&storage, BucketRole::LongVideos, objects, &ctx(Some(last_run)))
            .await
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key, "fresh.mp4");
    }

    #[tokio::test]
    async fn test_manifest_policy_selects_named_keys_per_role() {
        let storage = ManifestOnlyStorage {
            manifest: br#"{"long_videos": ["a.mp4"], "shorts_reels": ["s.mp4"]}"#.to_vec(),
        };
        let objects = vec![object("a.mp4", 600), object("b.mp4", 5)];

        let policy = ManifestPolicy::new("publishing_manifest.json");
        let selected = policy
            .select(&storage, BucketRole::LongVideos, objects, &ctx(None))
            .await
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key, "a.mp4");
    }

    #[tokio::test]
    async fn test_manifest_policy_rejects_invalid_manifest() {
        let storage = ManifestOnlyStorage {
            manifest: b"not json".to_vec(),
        };

        let policy = ManifestPolicy::new("publishing_manifest.json");
        let result = policy
            .select(&storage, BucketRole::LongVideos, vec![], &ctx(None))
            .await;

        assert!(matches!(result, Err(PipelineError::Selection(_))));
    }
}
