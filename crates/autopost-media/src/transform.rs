//! Role-specific rendition building.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use autopost_models::BucketRole;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{self, VideoInfo};

/// Encoding parameters for rendition building.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// H.264 quality factor
    pub crf: u8,
    /// Encoder preset
    pub preset: String,
    /// AAC bitrate
    pub audio_bitrate: String,
    /// Short-form canvas width
    pub short_width: u32,
    /// Short-form canvas height
    pub short_height: u32,
    /// Maximum short-form duration in seconds
    pub short_max_duration: f64,
    /// Per-invocation FFmpeg timeout
    pub timeout: Duration,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            crf: 23,
            preset: "medium".to_string(),
            audio_bitrate: "192k".to_string(),
            short_width: 1080,
            short_height: 1920,
            short_max_duration: 60.0,
            timeout: Duration::from_secs(900),
        }
    }
}

/// One transform request: downloaded source in, finalized rendition out.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Downloaded source file
    pub input: PathBuf,
    /// Source bucket role, which selects the rendition shape
    pub role: BucketRole,
    /// Staging directory the encoder writes into
    pub temp_dir: PathBuf,
    /// Directory the finished rendition is finalized into
    pub output_dir: PathBuf,
    /// Optional music bed mixed under the original audio (short-form only)
    pub music_track: Option<PathBuf>,
}

/// Produces a platform rendition from a downloaded source asset.
///
/// The concrete invocation is behind this trait so the pipeline can be
/// exercised in tests without FFmpeg installed.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transform `request.input` into a rendition inside
    /// `request.output_dir`, returning the finalized path.
    async fn transform(&self, request: &TransformRequest) -> MediaResult<PathBuf>;
}

/// FFmpeg-backed transformer.
///
/// Long-form sources get a delivery re-encode; short-form sources are
/// adapted to a 9:16 canvas with a capped duration.
pub struct FfmpegTransformer {
    config: TransformConfig,
    runner: FfmpegRunner,
}

impl FfmpegTransformer {
    pub fn new(config: TransformConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.timeout);
        Self { config, runner }
    }

    fn rendition_name(input: &Path) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "rendition".to_string());
        format!("{stem}.mp4")
    }

    /// Long-form: re-encode for delivery, keep the original frame.
    fn long_form_command(&self, input: &Path, staged: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, staged)
            .video_codec("libx264")
            .crf(self.config.crf)
            .preset(self.config.preset.clone())
            .audio_codec("aac")
            .audio_bitrate(self.config.audio_bitrate.clone())
            .faststart()
    }

    /// Short-form: fit the frame onto a 9:16 canvas, cap the duration, and
    /// mix an optional music bed at low volume under the original audio.
    fn short_form_command(
        &self,
        input: &Path,
        staged: &Path,
        info: &VideoInfo,
        music: Option<&Path>,
    ) -> FfmpegCommand {
        let (w, h) = (self.config.short_width, self.config.short_height);
        let fit = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black"
        );

        let mut cmd = FfmpegCommand::new(input, staged);

        match music {
            Some(music_path) => {
                // Original audio stays dominant; the bed loops for the full
                // clip and the mix ends with the video.
                let filter = format!(
                    "[0:v]{fit}[v];\
                     [0:a]volume=6.0[a0];\
                     [1:a]volume=2.0,aloop=loop=-1:size=2e+09[a1];\
                     [a0][a1]amix=inputs=2:duration=first[a]"
                );
                cmd = cmd
                    .input(music_path)
                    .filter_complex(filter)
                    .map("[v]")
                    .map("[a]")
                    .arg("-shortest");
            }
            None => {
                cmd = cmd.video_filter(fit);
            }
        }

        if info.duration > self.config.short_max_duration {
            cmd = cmd.limit_duration(self.config.short_max_duration);
        }

        cmd.video_codec("libx264")
            .crf(self.config.crf)
            .preset(self.config.preset.clone())
            .audio_codec("aac")
            .audio_bitrate(self.config.audio_bitrate.clone())
            .faststart()
    }
}

#[async_trait]
impl Transformer for FfmpegTransformer {
    async fn transform(&self, request: &TransformRequest) -> MediaResult<PathBuf> {
        let info = probe::probe_video(&request.input).await?;
        debug!(
            input = %request.input.display(),
            width = info.width,
            height = info.height,
            duration = info.duration,
            "Probed source asset"
        );

        let name = Self::rendition_name(&request.input);
        let staged = request.temp_dir.join(&name);

        let cmd = match request.role {
            BucketRole::ShortsReels => self.short_form_command(
                &request.input,
                &staged,
                &info,
                request.music_track.as_deref(),
            ),
            _ => self.long_form_command(&request.input, &staged),
        };

        self.runner.run(&cmd).await?;

        if fs::metadata(&staged).await.is_err() {
            return Err(MediaError::MissingOutput(staged));
        }

        let finalized = request.output_dir.join(&name);
        finalize(&staged, &finalized).await?;

        info!(
            role = %request.role,
            output = %finalized.display(),
            "Rendition finalized"
        );
        Ok(finalized)
    }
}

/// Move a staged rendition into the output directory. Falls back to
/// copy-and-delete when the rename crosses filesystems (EXDEV).
async fn finalize(staged: &Path, dest: &Path) -> MediaResult<()> {
    match fs::rename(staged, dest).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(18) => {
            fs::copy(staged, dest).await?;
            if let Err(e) = fs::remove_file(staged).await {
                tracing::warn!("Failed to remove staged file {}: {}", staged.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(MediaError::from(e)),
    }
}
