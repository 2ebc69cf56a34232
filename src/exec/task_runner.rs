// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::tasks::BuildTask;

/// Run a single build task to completion and report its outcome back to the
/// runtime as a `TaskCompleted` event.
pub async fn run_task(
    task: ScheduledTask,
    build: Arc<BuildTask>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    debug!(task = %task.name, run_id = task.run_id, "task body started");
    let started = Instant::now();

    let outcome = build.run().await;

    debug!(
        task = %task.name,
        run_id = task.run_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        %outcome,
        "task body returned"
    );

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        debug!(task = %task.name, "runtime gone before completion could be reported");
    }
}
