// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::bindings::BindingSet;
use crate::watch::hash::{ContentHashes, content_hash};

/// Process a single changed path and trigger the tasks bound to it.
///
/// 1. Relativize the path against the project root.
/// 2. Look up the bound tasks; unbound paths are ignored.
/// 3. Skip the event if the file's content hash is unchanged.
/// 4. Send one trigger per bound task.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    bindings: &BindingSet,
    hashes: &mut ContentHashes,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let Some(rel) = relative_str(root, path) else {
        debug!(?path, ?root, "event outside the project root");
        return true;
    };

    let tasks = bindings.tasks_for(&rel);
    if tasks.is_empty() {
        return true;
    }

    if path.is_dir() {
        return true;
    }

    match content_hash(path).await {
        Ok(hash) => {
            if !hashes.record(path, hash) {
                debug!(path = %rel, "content unchanged; ignoring event");
                return true;
            }
        }
        Err(err) => {
            warn!(path = %rel, error = %err, "could not hash changed file; triggering anyway");
        }
    }

    for task in tasks {
        debug!(task = %task, path = %rel, "watch match -> triggering task");
        if runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
            .is_err()
        {
            warn!("runtime channel closed; stopping watch dispatch");
            return false;
        }
    }

    true
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to canonical paths when the watcher reports a different
/// absolute prefix for the same directory (symlinked temp dirs on macOS).
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            let root = root.canonicalize().ok()?;
            let parent = path.parent()?.canonicalize().ok()?;
            parent.strip_prefix(&root).ok()?.join(path.file_name()?)
        }
    };
    Some(rel.to_string_lossy().replace('\\', "/"))
}
