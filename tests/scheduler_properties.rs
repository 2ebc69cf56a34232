// tests/scheduler_properties.rs

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use sitepipe::dag::{DagGraph, Scheduler, TaskRunState, TaskSpec};
use sitepipe::engine::TaskOutcome;

/// A random DAG over `t0..tn`: task `i` may only depend on tasks `< i`.
fn arb_dag() -> impl Strategy<Value = (Vec<TaskSpec>, BTreeSet<String>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
            prop::collection::vec(prop::bool::weighted(0.25), n),
        )
            .prop_map(move |(edges, fails)| {
                let specs = (0..n)
                    .map(|i| {
                        let deps = (0..i).filter(|&j| edges[i][j]).map(|j| format!("t{j}"));
                        TaskSpec::new(format!("t{i}")).after(deps)
                    })
                    .collect();
                let failing = (0..n).filter(|&i| fails[i]).map(|i| format!("t{i}")).collect();
                (specs, failing)
            })
    })
}

fn ancestors(task: &str, graph: &DagGraph) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![task.to_string()];
    while let Some(t) = stack.pop() {
        for dep in graph.dependencies_of(&t) {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn every_run_terminates_with_consistent_outcomes((specs, failing) in arb_dag()) {
        let graph = DagGraph::new(&specs).unwrap();
        let mut scheduler = Scheduler::new(DagGraph::new(&specs).unwrap());

        let mut ready = Vec::new();
        for root in graph.roots() {
            ready.extend(scheduler.handle_trigger(&root));
        }

        let mut executions: HashMap<String, usize> = HashMap::new();
        while let Some(task) = ready.pop() {
            *executions.entry(task.name.clone()).or_default() += 1;
            for dep in graph.dependencies_of(&task.name) {
                prop_assert_eq!(
                    scheduler.run_state_of(dep),
                    Some(TaskRunState::DoneSuccess),
                    "{} dispatched before {}", task.name, dep
                );
            }
            let outcome = if failing.contains(&task.name) {
                TaskOutcome::Failed("boom".to_string())
            } else {
                TaskOutcome::Success
            };
            ready.extend(scheduler.handle_completion(&task.name, &outcome));
        }

        prop_assert!(scheduler.is_idle());
        prop_assert!(executions.values().all(|&n| n == 1));

        for task in graph.tasks() {
            let state = scheduler.run_state_of(task);
            match state {
                Some(TaskRunState::DoneSuccess) | Some(TaskRunState::DoneFailed) => {
                    prop_assert!(executions.contains_key(task));
                    prop_assert_eq!(
                        state == Some(TaskRunState::DoneFailed),
                        failing.contains(task)
                    );
                }
                Some(TaskRunState::Skipped) => {
                    prop_assert!(!executions.contains_key(task));
                    let failed_ancestor = ancestors(task, &graph).iter().any(|a| {
                        scheduler.run_state_of(a) == Some(TaskRunState::DoneFailed)
                    });
                    prop_assert!(failed_ancestor, "{} skipped without a failed ancestor", task);
                }
                other => prop_assert!(false, "{} ended in {:?}", task, other),
            }
        }
    }
}
