// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use super::TaskName;

/// Queue of triggers that arrive while the triggered task is already part of
/// the active DAG run.
///
/// Semantics:
/// - Each queued entry is a *batch* of task names to trigger together in one
///   future run.
/// - A trigger joins the newest batch unless that batch already holds the
///   task; then it opens a new batch, so a task saved again during a queued
///   re-run gets another re-run.
/// - At most `max_runs` batches are remembered. Once full, further triggers
///   coalesce into the newest batch.
/// - When the runtime becomes idle it calls `pop_next()` and starts one run
///   from the oldest batch.
#[derive(Debug)]
pub struct TriggerQueue {
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// Create a new queue with the given maximum number of queued runs.
    ///
    /// `max_runs` is clamped to at least 1.
    pub fn new(max_runs: usize) -> Self {
        Self {
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Record that a task was triggered while it is part of the active run.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();
        let queued = self.runs.len();

        match self.runs.back_mut() {
            Some(last) if !last.contains(&name) => {
                debug!(task = %name, "merged trigger into last queued batch");
                last.insert(name);
            }
            Some(_) if queued >= self.max_runs => {
                debug!(
                    task = %name,
                    max_runs = self.max_runs,
                    "queue full; trigger coalesced into last batch"
                );
            }
            _ => {
                debug!(task = %name, queued = self.runs.len() + 1, "queued new batch");
                self.runs.push_back(BTreeSet::from([name]));
            }
        }
    }

    /// Take the oldest queued batch (sorted, without duplicates); empty when
    /// nothing is queued.
    pub fn pop_next(&mut self) -> Vec<TaskName> {
        let tasks: Vec<TaskName> = self
            .runs
            .pop_front()
            .map(|batch| batch.into_iter().collect())
            .unwrap_or_default();
        debug!(tasks = tasks.len(), remaining = self.runs.len(), "popped queued batch");
        tasks
    }
}
