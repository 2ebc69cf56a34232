// src/serve/reload.rs

//! Live-reload broadcast channel shared by transformers and the server.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Message pushed to every connected browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Full page reload.
    Reload,
    /// Swap one stylesheet in place; `path` is relative to the output root.
    Css { path: String },
}

impl ReloadEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"kind":"reload"}"#.to_string())
    }
}

/// Cloneable handle; sending with no browser connected is a no-op.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn notify(&self, event: ReloadEvent) {
        match self.tx.send(event) {
            Ok(n) => trace!(receivers = n, "live reload broadcast"),
            Err(_) => trace!("live reload broadcast with no listeners"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }
}
