// src/tasks/mod.rs

//! Build tasks: what each named node of the task DAG actually does, and how
//! entry points map to DAGs.

pub mod clean;
pub mod composer;
pub mod critical;

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::{TaskName, TaskOutcome};
use crate::pipeline::{Transformer, catalog};
use crate::serve::reload::LiveReload;
use crate::settings::BuildSettings;

pub use clean::Cleaner;
pub use composer::Plan;
pub use critical::CriticalCss;

/// Task names as they appear in the DAG, the CLI and the logs.
pub mod names {
    pub const CLEAR: &str = "clear";
    pub const HTML: &str = "html";
    pub const STYLE: &str = "style";
    pub const JS: &str = "js";
    pub const IMG: &str = "img";
    pub const WEBP: &str = "webp";
    pub const AVIF: &str = "avif";
    pub const COPY: &str = "copy";
    pub const FAVICON: &str = "favicon";
    pub const CRIT_CSS: &str = "critCSS";

    /// Members of the `base` parallel group.
    pub const BASE: [&str; 8] = [HTML, STYLE, JS, IMG, AVIF, WEBP, COPY, FAVICON];
}

/// One runnable unit of work.
#[derive(Debug)]
pub enum BuildTask {
    Clean(Cleaner),
    Transform(Transformer),
    Critical(CriticalCss),
}

impl BuildTask {
    pub async fn run(&self) -> TaskOutcome {
        match self {
            BuildTask::Clean(c) => c.run().await,
            BuildTask::Transform(t) => t.run().await,
            BuildTask::Critical(c) => c.run().await,
        }
    }
}

/// Task implementations by name, shared with the executor.
pub type TaskRegistry = Arc<HashMap<TaskName, Arc<BuildTask>>>;

/// Every task the composer can schedule, resolved against `settings`.
pub fn registry(settings: &Arc<BuildSettings>, reload: &LiveReload) -> TaskRegistry {
    let mut tasks: HashMap<TaskName, Arc<BuildTask>> = HashMap::new();

    tasks.insert(
        names::CLEAR.to_string(),
        Arc::new(BuildTask::Clean(Cleaner::new(&settings.layout.dist))),
    );
    tasks.insert(
        names::CRIT_CSS.to_string(),
        Arc::new(BuildTask::Critical(CriticalCss::new(Arc::clone(settings)))),
    );
    for transformer in catalog::transformers(settings, reload) {
        tasks.insert(
            transformer.name().to_string(),
            Arc::new(BuildTask::Transform(transformer)),
        );
    }

    Arc::new(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::types::Mode;

    #[test]
    fn registry_covers_every_task_name() {
        let settings = Arc::new(BuildSettings::from_config(
            &ConfigFile::default(),
            "/project",
            Mode::Production,
        ));
        let registry = registry(&settings, &LiveReload::new());

        for name in names::BASE.iter().chain(&[names::CLEAR, names::CRIT_CSS]) {
            assert!(registry.contains_key(*name), "missing {name}");
        }
        assert_eq!(registry.len(), 10);
    }
}
