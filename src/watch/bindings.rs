// src/watch/bindings.rs

use std::fmt;

use anyhow::Result;
use globset::GlobMatcher;

use crate::engine::TaskName;
use crate::pipeline::asset::compile_glob;

/// A glob (relative to the project root) and the task a match triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub glob: String,
    pub task: TaskName,
}

impl WatchBinding {
    pub fn new(glob: impl Into<String>, task: impl Into<TaskName>) -> Self {
        Self {
            glob: glob.into(),
            task: task.into(),
        }
    }
}

impl fmt::Display for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.glob, self.task)
    }
}

/// Compiled bindings.
///
/// Several bindings may share a glob or a task; a path yields each bound
/// task once.
#[derive(Clone)]
pub struct BindingSet {
    entries: Vec<(GlobMatcher, TaskName)>,
}

impl fmt::Debug for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSet")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl BindingSet {
    pub fn compile(bindings: &[WatchBinding]) -> Result<Self> {
        let entries = bindings
            .iter()
            .map(|b| Ok((compile_glob(&b.glob)?.compile_matcher(), b.task.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Tasks bound to `rel_path` (relative to the root, `/`-separated), in
    /// binding order without duplicates.
    pub fn tasks_for(&self, rel_path: &str) -> Vec<TaskName> {
        let rel_path = rel_path.trim_start_matches("./");
        let mut out: Vec<TaskName> = Vec::new();
        for (matcher, task) in &self.entries {
            if matcher.is_match(rel_path) && !out.contains(task) {
                out.push(task.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_globs_trigger_each_task_once() {
        let set = BindingSet::compile(&[
            WatchBinding::new("src/image/**/*.{jpg,jpeg,png}", "webp"),
            WatchBinding::new("src/image/**/*.{jpg,jpeg,png}", "avif"),
            WatchBinding::new("src/image/**/*.{jpg,jpeg,png,svg,gif}", "img"),
            WatchBinding::new("src/image/**/*.png", "img"),
        ])
        .unwrap();

        assert_eq!(set.tasks_for("src/image/a/b.png"), ["webp", "avif", "img"]);
        assert_eq!(set.tasks_for("src/image/logo.svg"), ["img"]);
        assert!(set.tasks_for("src/script/app.js").is_empty());
    }
}
