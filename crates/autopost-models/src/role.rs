//! Logical storage bucket roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Logical category of a storage bucket.
///
/// Roles are resolved to physical bucket names at process start and stay
/// fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRole {
    /// Supplementary material (music beds, overlays, fonts)
    Assets,
    /// Long-form source content
    LongVideos,
    /// Short-form source content (shorts and reels)
    ShortsReels,
    /// Configuration documents (selection manifests)
    Config,
}

impl BucketRole {
    /// All roles, in configuration resolution order.
    pub const ALL: [BucketRole; 4] = [
        BucketRole::Assets,
        BucketRole::LongVideos,
        BucketRole::ShortsReels,
        BucketRole::Config,
    ];

    /// Roles scanned for publishable source assets.
    pub const SOURCES: [BucketRole; 2] = [BucketRole::LongVideos, BucketRole::ShortsReels];

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketRole::Assets => "assets",
            BucketRole::LongVideos => "long_videos",
            BucketRole::ShortsReels => "shorts_reels",
            BucketRole::Config => "config",
        }
    }
}

impl fmt::Display for BucketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Error)]
#[error("unknown bucket role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for BucketRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assets" => Ok(BucketRole::Assets),
            "long_videos" => Ok(BucketRole::LongVideos),
            "shorts_reels" => Ok(BucketRole::ShortsReels),
            "config" => Ok(BucketRole::Config),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in BucketRole::ALL {
            assert_eq!(role.as_str().parse::<BucketRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("thumbnails".parse::<BucketRole>().is_err());
    }

    #[test]
    fn test_sources_are_video_roles() {
        assert!(BucketRole::SOURCES.contains(&BucketRole::LongVideos));
        assert!(BucketRole::SOURCES.contains(&BucketRole::ShortsReels));
        assert!(!BucketRole::SOURCES.contains(&BucketRole::Config));
    }
}
