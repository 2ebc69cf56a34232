// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive while tasks run)
//! - the main runtime event loop that reacts to:
//!   - initial and file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeMap;
use std::fmt;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a single task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Completed, but recoverable problems were logged along the way
    /// (a style file that failed to compile, a page without critical CSS).
    Degraded(Vec<String>),
    Failed(String),
}

impl TaskOutcome {
    /// Whether dependents may run after this outcome.
    pub fn is_ok(&self) -> bool {
        !matches!(self, TaskOutcome::Failed(_))
    }

    /// Build an outcome from collected diagnostics.
    pub fn from_diagnostics(diagnostics: Vec<String>) -> Self {
        if diagnostics.is_empty() {
            TaskOutcome::Success
        } else {
            TaskOutcome::Degraded(diagnostics)
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Success => f.write_str("ok"),
            TaskOutcome::Degraded(d) => write!(f, "ok with {} warning(s)", d.len()),
            TaskOutcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial trigger from the entry point.
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the DAG is idle and there are no
    /// queued triggers (every entry point except the watch phase).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the entry point, watcher and executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be (logically) triggered.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Outcomes collected while the runtime was running.
///
/// For a one-shot entry point this describes exactly one DAG run; in watch
/// mode it holds the latest outcome of every task that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: BTreeMap<TaskName, TaskOutcome>,
    /// Tasks that never ran because an upstream task failed.
    pub skipped: Vec<TaskName>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(TaskOutcome::is_ok)
    }

    pub fn outcome_of(&self, task: &str) -> Option<&TaskOutcome> {
        self.outcomes.get(task)
    }

    /// Failed tasks and their messages, in name order.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                TaskOutcome::Failed(msg) => Some((name.as_str(), msg.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn was_skipped(&self, task: &str) -> bool {
        self.skipped.iter().any(|t| t == task)
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
