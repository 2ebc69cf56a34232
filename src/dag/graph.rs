// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{Result, SitepipeError};

/// Declaration of one node in a task graph: a name plus the tasks it must
/// wait for.
///
/// A parallel group is a set of specs sharing the same `after` list; a
/// sequence is a chain of `after` edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    pub after: Vec<TaskName>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            after: Vec::new(),
        }
    }

    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.after.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory DAG keyed by task name.
///
/// Construction validates the declarations (unknown or self dependencies,
/// duplicate names, cycles); afterwards it only answers adjacency queries for
/// scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build and validate a DAG from task declarations.
    pub fn new(specs: &[TaskSpec]) -> Result<Self> {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();

        for spec in specs {
            let node = DagNode {
                deps: spec.after.clone(),
                dependents: Vec::new(),
            };
            if nodes.insert(spec.name.clone(), node).is_some() {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' is declared twice",
                    spec.name
                )));
            }
        }

        validate_dependencies(specs, &nodes)?;
        validate_acyclic(specs)?;

        // Second pass: populate dependents based on deps.
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();
        for spec in specs {
            for dep in &spec.after {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(spec.name.clone());
            }
        }
        for (name, list) in dependents {
            if let Some(node) = nodes.get_mut(&name) {
                node.dependents = list;
            }
        }

        Ok(Self { nodes })
    }

    /// All task names, in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn contains(&self, task: &str) -> bool {
        self.nodes.contains_key(task)
    }

    /// Direct dependencies of a task (empty for unknown tasks).
    pub fn dependencies_of(&self, task: &str) -> &[TaskName] {
        self.nodes
            .get(task)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Direct dependents of a task (empty for unknown tasks).
    pub fn dependents_of(&self, task: &str) -> &[TaskName] {
        self.nodes
            .get(task)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks without dependencies; triggering these runs the whole graph.
    pub fn roots(&self) -> Vec<TaskName> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn validate_dependencies(specs: &[TaskSpec], nodes: &BTreeMap<TaskName, DagNode>) -> Result<()> {
    for spec in specs {
        for dep in &spec.after {
            if dep == &spec.name {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    spec.name
                )));
            }
            if !nodes.contains_key(dep) {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}'",
                    spec.name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(specs: &[TaskSpec]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for spec in specs {
        graph.add_node(spec.name.as_str());
    }
    for spec in specs {
        for dep in &spec.after {
            graph.add_edge(dep.as_str(), spec.name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SitepipeError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_dependents_and_roots() {
        let graph = DagGraph::new(&[
            TaskSpec::new("clear"),
            TaskSpec::new("html").after(["clear"]),
            TaskSpec::new("style").after(["clear"]),
            TaskSpec::new("critCSS").after(["html", "style"]),
        ])
        .unwrap();

        assert_eq!(graph.roots(), vec!["clear".to_string()]);
        let mut dependents = graph.dependents_of("clear").to_vec();
        dependents.sort();
        assert_eq!(dependents, vec!["html", "style"]);
        assert_eq!(graph.dependencies_of("critCSS"), ["html", "style"]);
        assert!(graph.dependents_of("nope").is_empty());
    }

    #[test]
    fn rejects_cycles() {
        let err = DagGraph::new(&[
            TaskSpec::new("a").after(["b"]),
            TaskSpec::new("b").after(["a"]),
        ])
        .unwrap_err();
        assert!(matches!(err, SitepipeError::DagCycle(ref m) if m.contains("cycle detected")));
    }

    #[test]
    fn rejects_unknown_and_self_dependencies() {
        let err = DagGraph::new(&[TaskSpec::new("a").after(["ghost"])]).unwrap_err();
        assert!(err.to_string().contains("unknown dependency 'ghost'"));

        let err = DagGraph::new(&[TaskSpec::new("a").after(["a"])]).unwrap_err();
        assert!(err.to_string().contains("cannot depend on itself"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = DagGraph::new(&[TaskSpec::new("a"), TaskSpec::new("a")]).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }
}
