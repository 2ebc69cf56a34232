// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling watch bindings (glob -> task).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Dropping events whose file content did not change.
//!
//! It does **not** know about the DAG or the running tasks; it only turns
//! filesystem changes into task-level triggers. Coalescing of repeated
//! triggers is the engine's job.

pub mod bindings;
pub mod event_handler;
pub mod hash;
pub mod watcher;

pub use bindings::{BindingSet, WatchBinding};
pub use hash::{ContentHashes, content_hash};
pub use watcher::{WatcherHandle, spawn_watcher};
