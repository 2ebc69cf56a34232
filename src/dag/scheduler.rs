// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a triggered task is "ready" to run (deps satisfied)
/// - marking tasks as succeeded/failed
/// - scheduling dependents when appropriate
/// - skipping dependents when a task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`DagGraph`].
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Start a new run, resetting per-run state but keeping historical success
    /// information (for dependency satisfaction on later runs).
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new DAG run");
    }

    /// Handle a trigger for a task name (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Determine whether all tasks are in a terminal state and clear
    /// `current_run_id` if so.
    ///
    /// Returns `true` if this call transitioned the scheduler from running
    /// to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; marking run as finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        if self.current_run_id.is_none() {
            debug!(
                task = %task,
                "trigger with no active run; implicitly starting a new run"
            );
            self.start_new_run();
        }

        if self.tasks.contains_key(task) {
            let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
            manager.mark_task_and_dependents_pending(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_skipped = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) if outcome.is_ok() => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_successful_run = Some(run_id);
                debug!(task = %info.name, run_id, "task completed successfully");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                newly_scheduled.extend(manager.collect_new_ready_tasks());
            }
            Some(info) => {
                info.run_state = Some(RunState::DoneFailed);
                warn!(
                    task = %info.name,
                    run_id,
                    "task failed; skipping its dependents in this run"
                );
                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                newly_skipped = manager.mark_dependents_skipped(task);
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            run_just_finished,
        }
    }
}
