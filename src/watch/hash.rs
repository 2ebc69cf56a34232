// src/watch/hash.rs

//! Content hashing for change detection.
//!
//! Editors frequently emit several events for one save (write, chmod, close),
//! and touching a file without changing it emits one too. The watcher only
//! triggers when a file's content differs from what it last dispatched.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;

/// Hash of a file's current content, or `None` if it no longer exists.
pub async fn content_hash(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mut hasher = Hasher::new();
            hasher.update(&bytes);
            Ok(Some(hasher.finalize().to_hex().to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("hashing {}", path.display())),
    }
}

/// Last dispatched content hash per path, kept in memory for the lifetime of
/// the watcher.
#[derive(Debug, Default)]
pub struct ContentHashes {
    last: HashMap<PathBuf, Option<String>>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` for `path`; returns whether it differs from the previous
    /// record. A path seen for the first time counts as changed.
    pub fn record(&mut self, path: &Path, hash: Option<String>) -> bool {
        match self.last.get(path) {
            Some(prev) if *prev == hash => false,
            _ => {
                self.last.insert(path.to_path_buf(), hash);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_content_is_not_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.scss");
        let mut hashes = ContentHashes::new();

        std::fs::write(&file, "a{}").unwrap();
        assert!(hashes.record(&file, content_hash(&file).await.unwrap()));
        assert!(!hashes.record(&file, content_hash(&file).await.unwrap()));

        std::fs::write(&file, "b{}").unwrap();
        assert!(hashes.record(&file, content_hash(&file).await.unwrap()));

        std::fs::remove_file(&file).unwrap();
        let gone = content_hash(&file).await.unwrap();
        assert_eq!(gone, None);
        assert!(hashes.record(&file, gone));
    }
}
