//! S3 object storage for the autopost pipeline.
//!
//! This crate provides:
//! - `BucketRoleConfig`: logical role → physical bucket resolution
//! - The `ObjectStorage` trait the pipeline is written against
//! - `S3Client`: the AWS SDK implementation for any S3-compatible endpoint

pub mod client;
pub mod config;
pub mod error;

pub use client::{ObjectInfo, ObjectStorage, S3Client};
pub use config::{BucketRoleConfig, S3Config};
pub use error::{StorageError, StorageResult};
