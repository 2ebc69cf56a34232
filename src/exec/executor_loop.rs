// src/exec/executor_loop.rs

//! Main executor loop that runs scheduled build tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::exec::task_runner::run_task;
use crate::tasks::TaskRegistry;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// uses to hand over work. Each scheduled task runs in its own Tokio task.
/// A re-dispatched task waits for its previous instance to finish, so one
/// task name never has two instances writing the same outputs.
pub fn spawn_executor(
    registry: TaskRegistry,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        debug!("executor loop started");

        let mut active: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            handle_scheduled_task(task, &registry, &mut active, &runtime_tx).await;
        }

        debug!("executor loop finished (channel closed)");
    });

    tx
}

async fn handle_scheduled_task(
    task: ScheduledTask,
    registry: &TaskRegistry,
    active: &mut HashMap<String, JoinHandle<()>>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();

    let Some(build) = registry.get(&name).map(Arc::clone) else {
        error!(task = %name, "no implementation registered for task");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: name.clone(),
                outcome: TaskOutcome::Failed(format!("unknown task '{name}'")),
            })
            .await;
        return;
    };

    // The previous instance has already reported completion (the core only
    // re-dispatches after that), but its tokio task may still be unwinding.
    // Chain behind it instead of dropping the dispatch.
    let previous = active.remove(&name);

    let rt_tx = runtime_tx.clone();
    let handle = tokio::spawn(async move {
        if let Some(previous) = previous
            && let Err(err) = previous.await
        {
            warn!(task = %task.name, error = %err, "previous instance ended abnormally");
        }
        run_task(task, build, rt_tx).await;
    });

    active.insert(name, handle);
}
