// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::bindings::BindingSet;
use crate::watch::event_handler::process_file_change;
use crate::watch::hash::ContentHashes;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over `watch_dir` (recursively) that sends
/// `RuntimeEvent::TaskTriggered` for every task bound to a changed path.
///
/// Binding globs are evaluated relative to `root`.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    watch_dir: impl Into<PathBuf>,
    bindings: BindingSet,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let watch_dir = watch_dir.into();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch consumer gone; dropping notify event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher
        .watch(&watch_dir, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", watch_dir.display()))?;

    info!(dir = %watch_dir.display(), "file watcher started");

    tokio::spawn(async move {
        let mut hashes = ContentHashes::new();

        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                if !process_file_change(&root, path, &bindings, &mut hashes, &runtime_tx).await {
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
