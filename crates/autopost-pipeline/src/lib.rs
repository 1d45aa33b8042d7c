//! Run orchestration for the autopost publishing pipeline.
//!
//! This crate is the core of the system:
//! - `RunOrchestrator` guarantees at most one run at a time and exposes the
//!   run lifecycle for observation
//! - `MediaPipeline` drives discover → download → transform → upload with
//!   per-asset failure accumulation
//! - `WorkspaceManager` owns the scratch directories for a run
//! - `Scheduler` fires runs once per day and keeps the next fire time
//!   published

pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;
pub mod selection;
pub mod workspace;

pub use config::{PipelineConfig, ScheduleConfig, SelectionMode};
pub use error::{AssetFailure, PipelineError, PipelineResult, PipelineStage};
pub use orchestrator::{RunContext, RunGuard, RunOrchestrator, RunPipeline, TriggerError};
pub use pipeline::MediaPipeline;
pub use scheduler::{next_fire_time, Scheduler};
pub use selection::{ManifestPolicy, NewSinceLastRun, SelectionPolicy};
pub use workspace::{WorkingSet, WorkspaceManager};
