use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitepipe::dag::ScheduledTask;
use sitepipe::engine::{RuntimeEvent, TaskOutcome};
use sitepipe::errors::{Result, SitepipeError};
use sitepipe::exec::ExecutorBackend;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports `TaskCompleted` for each scheduled task, failing the
///   ones named in `failing`.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            executed: Arc::new(Mutex::new(Vec::new())),
            failing: HashSet::new(),
        }
    }

    pub fn failing<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(tasks.into_iter().map(Into::into));
        self
    }

    /// Shared log of executed task names.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(format!("{} failed on purpose", t.name))
                } else {
                    TaskOutcome::Success
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(|e| SitepipeError::Other(anyhow::anyhow!("runtime gone: {e}")))?;
            }
            Ok(())
        })
    }
}
