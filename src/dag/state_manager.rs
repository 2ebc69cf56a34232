// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task and all its downstream dependents in this run.
    ///
    /// - Tasks that were not yet part of the run (`run_state == None`) are
    ///   marked `Pending`.
    /// - Tasks already participating in this run keep their current state.
    pub fn mark_task_and_dependents_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }

                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            } else {
                warn!(task = %name, "node in DAG not present in tasks map");
            }
        }
    }

    /// Mark every pending dependent (transitively) of a failed task as
    /// `Skipped` for this run.
    ///
    /// Returns the newly skipped tasks, excluding the failed task itself.
    pub fn mark_dependents_skipped(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if matches!(info.run_state, Some(RunState::Pending)) {
                    info.run_state = Some(RunState::Skipped);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "skipping task due to upstream failure"
                    );
                    newly_skipped.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        newly_skipped
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = {
            let ro = ReadOnlyStateManager::new(self.tasks);
            let mut names: Vec<TaskName> = self
                .tasks
                .values()
                .filter(|info| {
                    matches!(info.run_state, Some(RunState::Pending))
                        && ro.deps_satisfied_for_info(info)
                })
                .map(|info| info.name.clone())
                .collect();
            // Stable dispatch order keeps logs and tests deterministic.
            names.sort();
            names
        };

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(task = %info.name, run_id = self.current_run_id, "starting task");

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if every task in the run is in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .all(|info| info.run_state.is_none_or(RunState::is_terminal))
    }
}

/// A read-only view of the tasks map for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Determine whether all dependencies of the given task are satisfied for
    /// the *current run*.
    ///
    /// Dependencies participating in the run must have succeeded in it;
    /// dependencies outside the run are satisfied by an earlier success.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                return false;
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => true,
                Some(_) => false,
                None => dep.last_successful_run.is_some(),
            }
        })
    }
}
