//! End-to-end pipeline tests with in-memory storage and a scripted
//! transformer.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use autopost_media::{MediaError, MediaResult, TransformRequest, Transformer};
use autopost_models::{BucketRole, RunId, RunTrigger};
use autopost_pipeline::{
    MediaPipeline, NewSinceLastRun, PipelineConfig, RunContext, RunPipeline, WorkspaceManager,
};
use autopost_storage::{ObjectInfo, ObjectStorage, StorageError, StorageResult};

/// In-memory object storage with scripted failures.
#[derive(Default)]
struct FakeStorage {
    objects: Mutex<HashMap<(BucketRole, String), Vec<u8>>>,
    uploads: Mutex<Vec<(BucketRole, String)>>,
    fail_downloads: HashSet<String>,
    fail_uploads: HashSet<String>,
    fail_listing: bool,
}

impl FakeStorage {
    fn with_object(self, role: BucketRole, key: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((role, key.to_string()), b"source-bytes".to_vec());
        self
    }

    fn uploaded_keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn list_objects(&self, role: BucketRole, _prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        if self.fail_listing {
            return Err(StorageError::ListFailed("storage unreachable".to_string()));
        }
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|(r, _)| *r == role)
            .map(|(_, key)| ObjectInfo {
                key: key.clone(),
                size: 12,
                last_modified: Some(Utc::now()),
            })
            .collect())
    }

    async fn download_file(&self, role: BucketRole, key: &str, path: &Path) -> StorageResult<()> {
        if self.fail_downloads.contains(key) {
            return Err(StorageError::download_failed(format!(
                "simulated download failure for {key}"
            )));
        }
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(&(role, key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    async fn download_bytes(&self, role: BucketRole, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(role, key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn upload_file(
        &self,
        role: BucketRole,
        path: &Path,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<()> {
        if self.fail_uploads.contains(key) {
            return Err(StorageError::upload_failed(format!(
                "simulated upload failure for {key}"
            )));
        }
        assert!(path.exists(), "upload source {} must exist", path.display());
        self.uploads.lock().unwrap().push((role, key.to_string()));
        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Transformer that writes a marker file instead of invoking FFmpeg.
#[derive(Default)]
struct FakeTransformer {
    fail_inputs: HashSet<String>,
    requests: Mutex<Vec<TransformRequest>>,
}

impl FakeTransformer {
    fn failing_on(mut self, local_file_name: &str) -> Self {
        self.fail_inputs.insert(local_file_name.to_string());
        self
    }
}

#[async_trait]
impl Transformer for FakeTransformer {
    async fn transform(&self, request: &TransformRequest) -> MediaResult<PathBuf> {
        self.requests.lock().unwrap().push(request.clone());

        let name = request
            .input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_inputs.contains(&name) {
            return Err(MediaError::ffmpeg_failed(
                "simulated transform failure",
                None,
                Some(1),
            ));
        }

        let out = request.output_dir.join(&name);
        std::fs::write(&out, b"rendition-bytes")?;
        Ok(out)
    }
}

fn run_context() -> RunContext {
    RunContext {
        run_id: RunId::new(),
        trigger: RunTrigger::Manual,
        last_run: None,
    }
}

fn pipeline_with(
    storage: Arc<FakeStorage>,
    transformer: Arc<FakeTransformer>,
    work_root: &Path,
    config: PipelineConfig,
) -> MediaPipeline {
    MediaPipeline::new(
        storage,
        transformer,
        Arc::new(NewSinceLastRun),
        WorkspaceManager::new(work_root),
        config,
    )
}

fn assert_workspace_empty(work_root: &Path) {
    for dir in ["download", "temp", "output"] {
        let path = work_root.join(dir);
        assert!(path.is_dir(), "{dir} should exist after the run");
        assert_eq!(
            std::fs::read_dir(&path).unwrap().count(),
            0,
            "{dir} should be empty after the run"
        );
    }
}

#[tokio::test]
async fn test_all_assets_published() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        FakeStorage::default()
            .with_object(BucketRole::LongVideos, "episode.mp4")
            .with_object(BucketRole::ShortsReels, "teaser.mp4"),
    );
    let transformer = Arc::new(FakeTransformer::default());
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        transformer,
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 200);
    let mut uploaded = storage.uploaded_keys();
    uploaded.sort();
    assert_eq!(uploaded, vec!["published/episode.mp4", "published/teaser.mp4"]);
    assert_workspace_empty(root.path());
}

#[tokio::test]
async fn test_single_transform_failure_is_partial_and_isolated() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        FakeStorage::default()
            .with_object(BucketRole::LongVideos, "clip1.mp4")
            .with_object(BucketRole::LongVideos, "clip2.mp4")
            .with_object(BucketRole::LongVideos, "clip3.mp4"),
    );
    // The transformer sees the role-prefixed local name.
    let transformer = Arc::new(FakeTransformer::default().failing_on("long_videos--clip2.mp4"));
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        transformer,
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 207);
    assert!(outcome.body.contains("clip2.mp4"));
    assert!(!outcome.body.contains("clip1.mp4"));
    assert!(!outcome.body.contains("clip3.mp4"));

    let mut uploaded = storage.uploaded_keys();
    uploaded.sort();
    assert_eq!(uploaded, vec!["published/clip1.mp4", "published/clip3.mp4"]);
    assert_workspace_empty(root.path());
}

#[tokio::test]
async fn test_download_failure_skips_only_that_asset() {
    let root = tempfile::tempdir().unwrap();
    let mut storage = FakeStorage::default()
        .with_object(BucketRole::LongVideos, "good.mp4")
        .with_object(BucketRole::LongVideos, "gone.mp4");
    storage.fail_downloads.insert("gone.mp4".to_string());
    let storage = Arc::new(storage);

    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 207);
    assert!(outcome.body.contains("gone.mp4"));
    assert!(outcome.body.contains("download"));
    assert_eq!(storage.uploaded_keys(), vec!["published/good.mp4"]);
}

#[tokio::test]
async fn test_upload_failure_is_reported_per_asset() {
    let root = tempfile::tempdir().unwrap();
    let mut storage = FakeStorage::default().with_object(BucketRole::ShortsReels, "reel.mp4");
    storage.fail_uploads.insert("published/reel.mp4".to_string());
    let storage = Arc::new(storage);

    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 207);
    assert!(outcome.body.contains("upload"));
    assert!(storage.uploaded_keys().is_empty());
    assert_workspace_empty(root.path());
}

#[tokio::test]
async fn test_unreachable_storage_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(FakeStorage {
        fail_listing: true,
        ..FakeStorage::default()
    });
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 500);
    assert!(storage.uploaded_keys().is_empty());
    assert_workspace_empty(root.path());
}

#[tokio::test]
async fn test_workspace_failure_is_fatal_before_any_network_io() {
    let root = tempfile::tempdir().unwrap();
    let blocked = root.path().join("work");
    std::fs::write(&blocked, b"not a directory").unwrap();

    let storage = Arc::new(FakeStorage {
        // Listing would fail loudly if it were ever reached.
        fail_listing: true,
        ..FakeStorage::default()
    });
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        &blocked,
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 500);
    assert!(outcome.body.contains("workspace"));
    assert!(storage.uploaded_keys().is_empty());
}

#[tokio::test]
async fn test_empty_selection_is_a_successful_noop() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(FakeStorage::default());
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        root.path(),
        PipelineConfig::default(),
    );

    let outcome = pipeline.execute(run_context()).await;

    assert_eq!(outcome.status_code, 200);
    assert!(outcome.body.contains("no assets"));
    assert_workspace_empty(root.path());
}

#[tokio::test]
async fn test_music_bed_reaches_shorts_but_not_long_form() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        FakeStorage::default()
            .with_object(BucketRole::LongVideos, "episode.mp4")
            .with_object(BucketRole::ShortsReels, "teaser.mp4")
            .with_object(BucketRole::Assets, "beds/upbeat.mp3"),
    );
    let transformer = Arc::new(FakeTransformer::default());
    let config = PipelineConfig {
        music_track_key: Some("beds/upbeat.mp3".to_string()),
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::clone(&transformer),
        root.path(),
        config,
    );

    let outcome = pipeline.execute(run_context()).await;
    assert_eq!(outcome.status_code, 200);

    let requests = transformer.requests.lock().unwrap();
    for request in requests.iter() {
        match request.role {
            BucketRole::ShortsReels => assert!(request.music_track.is_some()),
            _ => assert!(request.music_track.is_none()),
        }
    }
}

#[tokio::test]
async fn test_rerun_produces_identical_destination_keys() {
    let root = tempfile::tempdir().unwrap();
    let storage = Arc::new(FakeStorage::default().with_object(BucketRole::LongVideos, "evergreen.mp4"));
    let pipeline = pipeline_with(
        Arc::clone(&storage),
        Arc::new(FakeTransformer::default()),
        root.path(),
        PipelineConfig::default(),
    );

    let first = pipeline.execute(run_context()).await;
    assert_eq!(first.status_code, 200);
    // A reprocess run selects the same asset again (no cutoff in context).
    let second = pipeline.execute(run_context()).await;
    assert_eq!(second.status_code, 200);

    let uploaded = storage.uploaded_keys();
    assert_eq!(uploaded.len(), 2);
    assert_eq!(uploaded[0], uploaded[1]);
    assert_eq!(uploaded[0], "published/evergreen.mp4");
}
