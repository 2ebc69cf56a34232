// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (one-shot entry points, once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   anything that was already queued.
/// - If a run is active and `task` is not part of it, merge it into the
///   current run immediately, so unrelated tasks run in parallel.
/// - If `task` is already part of the run, queue it for a future run. This is
///   what keeps two instances of the same task from ever running at once and
///   coalesces bursts of file events into one re-run.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.pop_next().into_iter().collect();
        triggers.insert(task);

        let mut step = start_new_run_from_triggers(scheduler, triggers.into_iter().collect());
        commands.append(&mut step.commands);
        return CoreStep::running(commands);
    }

    match scheduler.run_state_of(&task) {
        None => {
            warn!(task = %task, ?reason, "trigger for unknown task; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(&task);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    log_outcome(&task, &outcome);

    let step = scheduler.step_completion(&task, &outcome);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    report.skipped.retain(|t| t != &task);
    report.outcomes.insert(task, outcome);
    for skipped in step.newly_skipped {
        report.outcomes.remove(&skipped);
        if !report.skipped.contains(&skipped) {
            report.skipped.push(skipped);
        }
    }

    let mut queued_cmds = maybe_start_queued_run(scheduler, queue);
    commands.append(&mut queued_cmds);

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

fn log_outcome(task: &str, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Success => info!(task = %task, "task finished"),
        TaskOutcome::Degraded(diagnostics) => warn!(
            task = %task,
            warnings = diagnostics.len(),
            "task finished with warnings"
        ),
        TaskOutcome::Failed(msg) => warn!(task = %task, error = %msg, "task failed"),
    }
}

/// Seed a new run from a set of triggers.
///
/// Pure: returns commands instead of performing IO.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    let mut commands = Vec::new();

    if triggers.is_empty() {
        return CoreStep::running(commands);
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }

    CoreStep::running(commands)
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers = queue.pop_next();
    if triggers.is_empty() {
        return Vec::new();
    }

    start_new_run_from_triggers(scheduler, triggers).commands
}
