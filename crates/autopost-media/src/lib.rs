//! FFmpeg subprocess wrapper for rendition building.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner with per-invocation timeouts
//! - An ffprobe wrapper for stream inspection
//! - The `Transformer` trait and its FFmpeg-backed implementation

pub mod command;
pub mod error;
pub mod probe;
pub mod transform;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use transform::{FfmpegTransformer, TransformConfig, TransformRequest, Transformer};
