//! Pipeline and schedule configuration.

use std::path::PathBuf;
use std::time::Duration;

/// How assets are selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Everything modified since the previous run (first run takes all)
    #[default]
    NewSinceLastRun,
    /// Exactly the keys named by a manifest in the config bucket
    Manifest,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which the three working directories live
    pub work_dir: PathBuf,
    /// Per-asset FFmpeg timeout
    pub transform_timeout: Duration,
    /// Optional music bed key in the assets bucket, mixed into short-form
    /// renditions
    pub music_track_key: Option<String>,
    /// Asset selection mode
    pub selection: SelectionMode,
    /// Manifest key in the config bucket (manifest mode)
    pub manifest_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/autopost"),
            transform_timeout: Duration::from_secs(900),
            music_track_key: None,
            selection: SelectionMode::NewSinceLastRun,
            manifest_key: "publishing_manifest.json".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("AUTOPOST_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            transform_timeout: Duration::from_secs(
                std::env::var("AUTOPOST_TRANSFORM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
            music_track_key: std::env::var("AUTOPOST_MUSIC_TRACK_KEY").ok(),
            selection: match std::env::var("AUTOPOST_SELECTION").as_deref() {
                Ok("manifest") => SelectionMode::Manifest,
                _ => SelectionMode::NewSinceLastRun,
            },
            manifest_key: std::env::var("AUTOPOST_MANIFEST_KEY")
                .unwrap_or(defaults.manifest_key),
        }
    }
}

/// Daily schedule configuration.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Fire hour, UTC
    pub hour_utc: u32,
    /// Fire minute, UTC
    pub minute_utc: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour_utc: 12,
            minute_utc: 0,
        }
    }
}

impl ScheduleConfig {
    /// Create config from environment variables. Out-of-range values fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        Self {
            hour_utc: std::env::var("AUTOPOST_SCHEDULE_HOUR_UTC")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|h| *h < 24)
                .unwrap_or(12),
            minute_utc: std::env::var("AUTOPOST_SCHEDULE_MINUTE_UTC")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m| *m < 60)
                .unwrap_or(0),
        }
    }
}
