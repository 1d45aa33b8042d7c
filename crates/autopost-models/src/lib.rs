//! Shared data models for the autopost publishing pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Run lifecycle (trigger, outcome, status)
//! - Logical storage bucket roles
//! - Asset tracking through discover → download → transform → upload

pub mod asset;
pub mod role;
pub mod run;

// Re-export common types
pub use asset::{AssetRef, AssetState, PUBLISHED_PREFIX};
pub use role::{BucketRole, RoleParseError};
pub use run::{RunId, RunOutcome, RunStatus, RunTrigger};
