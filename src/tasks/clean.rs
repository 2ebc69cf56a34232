// src/tasks/clean.rs

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::engine::TaskOutcome;

/// Empties the output directory.
#[derive(Debug, Clone)]
pub struct Cleaner {
    dist: PathBuf,
}

impl Cleaner {
    pub fn new(dist: impl Into<PathBuf>) -> Self {
        Self { dist: dist.into() }
    }

    pub async fn run(&self) -> TaskOutcome {
        match self.clean().await {
            Ok(removed) => {
                info!(dist = %self.dist.display(), removed, "output directory cleared");
                TaskOutcome::Success
            }
            Err(err) => TaskOutcome::Failed(format!("{err:#}")),
        }
    }

    /// Remove every entry under the output directory, keeping the directory
    /// itself. Returns the number of top-level entries removed.
    pub async fn clean(&self) -> Result<usize> {
        let meta = match tokio::fs::metadata(&self.dist).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dist = %self.dist.display(), "output directory missing; nothing to clear");
                return Ok(0);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", self.dist.display()));
            }
        };
        if !meta.is_dir() {
            bail!("{} is not a directory", self.dist.display());
        }

        let mut entries = tokio::fs::read_dir(&self.dist)
            .await
            .with_context(|| format!("listing {}", self.dist.display()))?;
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("listing {}", self.dist.display()))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("inspecting {}", path.display()))?;
            let res = if file_type.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            res.with_context(|| format!("removing {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }
}
