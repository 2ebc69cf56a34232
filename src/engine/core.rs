// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels, sending `ScheduledTask`s to the executor and
//! handling shutdown.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreStep, handle_task_completion, handle_task_trigger};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeEvent, RuntimeOptions};

/// Pure core runtime state.
///
/// Owns the DAG scheduler, the trigger queue, runtime options and the report
/// of outcomes so far. It has no channels and performs no IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, queue_length: usize, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(queue_length),
            options,
            report: RunReport::default(),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.report,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{DagGraph, ScheduledTask, TaskSpec};
    use crate::engine::{CoreCommand, TaskOutcome, TriggerReason};

    fn watch_core() -> CoreRuntime {
        watch_core_with_queue(1)
    }

    fn watch_core_with_queue(queue_length: usize) -> CoreRuntime {
        let graph = DagGraph::new(&[TaskSpec::new("html"), TaskSpec::new("style")]).unwrap();
        CoreRuntime::new(
            Scheduler::new(graph),
            queue_length,
            RuntimeOptions {
                exit_when_idle: false,
            },
        )
    }

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome: TaskOutcome::Success,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => tasks.clone(),
                CoreCommand::RequestExit => Vec::<ScheduledTask>::new(),
            })
            .map(|t| t.name)
            .collect()
    }

    #[test]
    fn retrigger_while_running_is_serialized_and_coalesced() {
        let mut core = watch_core();

        assert_eq!(dispatched(&core.step(trigger("style"))), ["style"]);

        // Three saves while style is still compiling.
        for _ in 0..3 {
            assert!(dispatched(&core.step(trigger("style"))).is_empty());
        }
        assert!(!core.queue_is_empty());

        // One coalesced re-run once the first instance completes.
        assert_eq!(dispatched(&core.step(done("style"))), ["style"]);
        assert!(core.queue_is_empty());

        assert!(dispatched(&core.step(done("style"))).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn queue_length_bounds_the_number_of_reruns() {
        let mut core = watch_core_with_queue(2);

        assert_eq!(dispatched(&core.step(trigger("style"))), ["style"]);
        for _ in 0..5 {
            assert!(dispatched(&core.step(trigger("style"))).is_empty());
        }

        assert_eq!(dispatched(&core.step(done("style"))), ["style"]);
        assert!(!core.queue_is_empty());
        assert_eq!(dispatched(&core.step(done("style"))), ["style"]);
        assert!(core.queue_is_empty());

        assert!(dispatched(&core.step(done("style"))).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn unrelated_trigger_joins_active_run() {
        let mut core = watch_core();
        core.step(trigger("style"));
        assert_eq!(dispatched(&core.step(trigger("html"))), ["html"]);
    }

    #[test]
    fn shutdown_stops_loop() {
        let mut core = watch_core();
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
    }
}
