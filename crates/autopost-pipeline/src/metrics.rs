//! Prometheus metrics for run and asset processing events.

use metrics::{counter, histogram};

use autopost_models::{BucketRole, RunTrigger};

use crate::error::PipelineStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "autopost_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "autopost_runs_completed_total";
    pub const RUNS_REJECTED_BUSY_TOTAL: &str = "autopost_runs_rejected_busy_total";

    pub const ASSETS_PUBLISHED_TOTAL: &str = "autopost_assets_published_total";
    pub const ASSETS_FAILED_TOTAL: &str = "autopost_assets_failed_total";
    pub const TRANSFORM_DURATION_SECONDS: &str = "autopost_transform_duration_seconds";
}

/// Record a run start.
pub fn record_run_started(trigger: RunTrigger) {
    let labels = [("trigger", trigger.as_str().to_string())];
    counter!(names::RUNS_STARTED_TOTAL, &labels).increment(1);
}

/// Record a run completion with its outcome code.
pub fn record_run_completed(status_code: u16) {
    let labels = [("status", status_code.to_string())];
    counter!(names::RUNS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a busy rejection.
pub fn record_busy_rejection(trigger: RunTrigger) {
    let labels = [("trigger", trigger.as_str().to_string())];
    counter!(names::RUNS_REJECTED_BUSY_TOTAL, &labels).increment(1);
}

/// Record a published asset.
pub fn record_asset_published(role: BucketRole) {
    let labels = [("role", role.as_str().to_string())];
    counter!(names::ASSETS_PUBLISHED_TOTAL, &labels).increment(1);
}

/// Record a failed asset with the stage it failed in.
pub fn record_asset_failed(role: BucketRole, stage: PipelineStage) {
    let labels = [
        ("role", role.as_str().to_string()),
        ("stage", stage.as_str().to_string()),
    ];
    counter!(names::ASSETS_FAILED_TOTAL, &labels).increment(1);
}

/// Record the duration of one FFmpeg transform.
pub fn record_transform_duration(role: BucketRole, duration_secs: f64) {
    let labels = [("role", role.as_str().to_string())];
    histogram!(names::TRANSFORM_DURATION_SECONDS, &labels).record(duration_secs);
}
