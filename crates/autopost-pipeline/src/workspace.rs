//! Scratch directory management for a run.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// The three scratch locations owned by a single run.
///
/// Only one run exists at a time, so the directories are never shared.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    /// Source assets land here
    pub download_dir: PathBuf,
    /// Encoder staging area
    pub temp_dir: PathBuf,
    /// Finalized renditions awaiting upload
    pub output_dir: PathBuf,
}

impl WorkingSet {
    fn dirs(&self) -> [&Path; 3] {
        [&self.download_dir, &self.temp_dir, &self.output_dir]
    }
}

/// Creates the working directories before a run and empties them afterwards.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the download/temp/output directories, idempotently.
    ///
    /// Failure here aborts the run before any network I/O.
    pub async fn acquire(&self) -> PipelineResult<WorkingSet> {
        let ws = WorkingSet {
            download_dir: self.root.join("download"),
            temp_dir: self.root.join("temp"),
            output_dir: self.root.join("output"),
        };

        for dir in ws.dirs() {
            fs::create_dir_all(dir).await.map_err(|e| {
                PipelineError::workspace(format!("failed to create {}: {e}", dir.display()))
            })?;
            debug!("Prepared working directory {}", dir.display());
        }

        Ok(ws)
    }

    /// Empty all three directories, keeping the directories themselves.
    ///
    /// Removal failures are logged and never escalate: the run outcome has
    /// already been decided by the time cleanup happens.
    pub async fn release(&self, ws: &WorkingSet) {
        for dir in ws.dirs() {
            if let Err(e) = clear_dir(dir).await {
                warn!("Failed to clear {}: {}", dir.display(), e);
            }
        }
        debug!("Working directories cleared");
    }
}

async fn clear_dir(dir: &Path) -> std::io::Result<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
    }
    Ok(())
}
