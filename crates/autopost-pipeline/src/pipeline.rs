//! The publish pipeline: discover → download → transform → upload → cleanup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use autopost_media::{TransformRequest, Transformer};
use autopost_models::{AssetRef, AssetState, BucketRole, RunOutcome};
use autopost_storage::ObjectStorage;

use crate::config::PipelineConfig;
use crate::error::{AssetFailure, PipelineError, PipelineResult, PipelineStage};
use crate::metrics;
use crate::orchestrator::{RunContext, RunPipeline};
use crate::selection::SelectionPolicy;
use crate::workspace::{WorkingSet, WorkspaceManager};

/// The linear publish pipeline over one set of discovered assets.
///
/// Stateless between runs; all per-run state lives in the `WorkingSet` and
/// the asset list. Per-asset failures are accumulated, never fatal.
pub struct MediaPipeline {
    storage: Arc<dyn ObjectStorage>,
    transformer: Arc<dyn Transformer>,
    policy: Arc<dyn SelectionPolicy>,
    workspace: WorkspaceManager,
    config: PipelineConfig,
}

impl MediaPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        transformer: Arc<dyn Transformer>,
        policy: Arc<dyn SelectionPolicy>,
        workspace: WorkspaceManager,
        config: PipelineConfig,
    ) -> Self {
        Self {
            storage,
            transformer,
            policy,
            workspace,
            config,
        }
    }

    /// List both source roles and apply the selection policy.
    async fn discover(&self, ctx: &RunContext) -> PipelineResult<Vec<AssetRef>> {
        let mut assets = Vec::new();

        for role in BucketRole::SOURCES {
            let objects = self
                .storage
                .list_objects(role, "")
                .await
                .map_err(|e| PipelineError::discovery(format!("listing {role} failed: {e}")))?;

            let selected = self
                .policy
                .select(self.storage.as_ref(), role, objects, ctx)
                .await?;

            info!(role = %role, count = selected.len(), "Discovered assets");
            assets.extend(selected.into_iter().map(|o| AssetRef::new(role, o.key)));
        }

        Ok(assets)
    }

    /// Fetch the optional music bed from the assets bucket.
    ///
    /// An unavailable bed is logged and skipped; shorts are then rendered
    /// with their original audio only.
    async fn fetch_music_track(&self, ws: &WorkingSet) -> Option<PathBuf> {
        let key = self.config.music_track_key.as_ref()?;
        let bed = AssetRef::new(BucketRole::Assets, key.clone());
        let dest = ws.download_dir.join(bed.local_file_name());

        match self.storage.download_file(BucketRole::Assets, key, &dest).await {
            Ok(()) => Some(dest),
            Err(e) => {
                warn!(key = %key, "Music track unavailable, continuing without: {}", e);
                None
            }
        }
    }

    /// Run one asset through download → transform → upload.
    async fn publish_asset(
        &self,
        asset: &mut AssetRef,
        ws: &WorkingSet,
        music: Option<&PathBuf>,
    ) -> Result<(), AssetFailure> {
        let local = ws.download_dir.join(asset.local_file_name());
        if let Err(e) = self
            .storage
            .download_file(asset.role, &asset.key, &local)
            .await
        {
            return Err(AssetFailure::new(asset, PipelineStage::Download, e));
        }
        asset.local_path = Some(local.clone());
        asset.state = AssetState::Downloaded;

        let request = TransformRequest {
            input: local,
            role: asset.role,
            temp_dir: ws.temp_dir.clone(),
            output_dir: ws.output_dir.clone(),
            music_track: (asset.role == BucketRole::ShortsReels)
                .then(|| music.cloned())
                .flatten(),
        };

        let started = Instant::now();
        let rendition = match self.transformer.transform(&request).await {
            Ok(path) => path,
            Err(e) => return Err(AssetFailure::new(asset, PipelineStage::Transform, e)),
        };
        metrics::record_transform_duration(asset.role, started.elapsed().as_secs_f64());
        asset.rendition_path = Some(rendition.clone());
        asset.state = AssetState::Transformed;

        let destination = asset.destination_key();
        if let Err(e) = self
            .storage
            .upload_file(asset.role, &rendition, &destination, "video/mp4")
            .await
        {
            return Err(AssetFailure::new(asset, PipelineStage::Upload, e));
        }
        asset.destination_key = Some(destination);
        asset.state = AssetState::Uploaded;

        // Uploaded assets release their local files immediately; anything
        // left over is swept by the workspace release.
        if let Some(path) = &asset.local_path {
            tokio::fs::remove_file(path).await.ok();
        }
        tokio::fs::remove_file(&rendition).await.ok();
        asset.state = AssetState::Cleaned;

        Ok(())
    }

    async fn run_stages(&self, ctx: &RunContext, ws: &WorkingSet) -> RunOutcome {
        let assets = match self.discover(ctx).await {
            Ok(assets) => assets,
            Err(e) => {
                error!(run_id = %ctx.run_id, "Discovery failed: {}", e);
                return RunOutcome::fatal(format!("asset discovery failed: {e}"));
            }
        };

        if assets.is_empty() {
            info!(run_id = %ctx.run_id, "No assets eligible for publishing");
            return RunOutcome::success("no assets eligible for publishing");
        }

        info!(run_id = %ctx.run_id, count = assets.len(), "Publishing run starting");
        let music = self.fetch_music_track(ws).await;

        let mut failures: Vec<AssetFailure> = Vec::new();
        let mut published = 0usize;

        for mut asset in assets {
            match self.publish_asset(&mut asset, ws, music.as_ref()).await {
                Ok(()) => {
                    published += 1;
                    metrics::record_asset_published(asset.role);
                }
                Err(failure) => {
                    warn!(
                        run_id = %ctx.run_id,
                        role = %failure.role,
                        key = %failure.key,
                        stage = failure.stage.as_str(),
                        "Asset failed: {}", failure.reason
                    );
                    metrics::record_asset_failed(failure.role, failure.stage);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            RunOutcome::success(format!("published {published} asset(s)"))
        } else {
            let detail: Vec<String> = failures.iter().map(AssetFailure::describe).collect();
            RunOutcome::partial(format!(
                "published {published} asset(s), {} failed: {}",
                failures.len(),
                detail.join("; ")
            ))
        }
    }
}

#[async_trait]
impl RunPipeline for MediaPipeline {
    async fn execute(&self, ctx: RunContext) -> RunOutcome {
        let ws = match self.workspace.acquire().await {
            Ok(ws) => ws,
            Err(e) => {
                error!(run_id = %ctx.run_id, "Workspace unavailable: {}", e);
                return RunOutcome::fatal(format!("workspace unavailable: {e}"));
            }
        };

        let outcome = self.run_stages(&ctx, &ws).await;

        // Cleanup runs on every outcome and cannot change it.
        self.workspace.release(&ws).await;

        outcome
    }
}
