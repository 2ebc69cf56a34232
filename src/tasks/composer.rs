// src/tasks/composer.rs

//! Entry points to task DAGs.

use std::fmt::Write as _;

use crate::cli::EntryPoint;
use crate::dag::TaskSpec;
use crate::engine::TaskName;
use crate::settings::BuildSettings;
use crate::tasks::names;
use crate::types::{Mode, StyleVariant};
use crate::watch::WatchBinding;

/// What an entry point resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub mode: Mode,
    /// The one-shot DAG to run first (possibly empty).
    pub specs: Vec<TaskSpec>,
    /// Whether the watch server starts once the DAG succeeded.
    pub serve: bool,
}

impl Plan {
    /// Resolve an entry point. `None` is the default entry point; `dev`
    /// forces development mode for any entry point.
    pub fn for_entry(entry: Option<EntryPoint>, dev: bool) -> Self {
        let entry = entry.unwrap_or(EntryPoint::Develop);
        let mode = if dev || entry == EntryPoint::Develop {
            Mode::Development
        } else {
            Mode::Production
        };

        let single = |name: &str| vec![TaskSpec::new(name)];
        let (specs, serve) = match entry {
            EntryPoint::Html => (single(names::HTML), false),
            EntryPoint::Style => (single(names::STYLE), false),
            EntryPoint::Js => (single(names::JS), false),
            EntryPoint::Img => (single(names::IMG), false),
            EntryPoint::Webp => (single(names::WEBP), false),
            EntryPoint::Avif => (single(names::AVIF), false),
            EntryPoint::CritCss => (single(names::CRIT_CSS), false),
            EntryPoint::Copy => (single(names::COPY), false),
            EntryPoint::Favicon => (single(names::FAVICON), false),
            EntryPoint::Clear => (single(names::CLEAR), false),
            EntryPoint::Server => (Vec::new(), true),
            EntryPoint::Base => (base_group(&[]), false),
            EntryPoint::Develop => (base_group(&[]), true),
            EntryPoint::Build => {
                let mut specs = vec![TaskSpec::new(names::CLEAR)];
                specs.extend(base_group(&[names::CLEAR]));
                specs.push(TaskSpec::new(names::CRIT_CSS).after(names::BASE));
                (specs, false)
            }
        };

        Self { mode, specs, serve }
    }

    /// Tasks with no dependencies; triggering them starts the whole DAG.
    pub fn roots(&self) -> Vec<TaskName> {
        self.specs
            .iter()
            .filter(|s| s.after.is_empty())
            .map(|s| s.name.clone())
            .collect()
    }
}

/// The `base` group, every member depending on `after`.
fn base_group(after: &[&str]) -> Vec<TaskSpec> {
    names::BASE
        .iter()
        .map(|name| TaskSpec::new(*name).after(after.iter().copied()))
        .collect()
}

/// The DAG the watch phase runs: every transformer, independent.
pub fn watch_specs() -> Vec<TaskSpec> {
    base_group(&[])
}

/// Source globs (relative to the project root) and the tasks they rebuild.
pub fn watch_bindings(settings: &BuildSettings) -> Vec<WatchBinding> {
    let src = settings.layout.src_rel();
    let g = |pattern: &str| {
        if src.is_empty() {
            pattern.to_string()
        } else {
            format!("{src}/{pattern}")
        }
    };
    let style = match settings.style {
        StyleVariant::Scss => "scss/**/*.scss",
        StyleVariant::Css => "css/**/*.css",
    };

    vec![
        WatchBinding::new(g("**/*.html"), names::HTML),
        WatchBinding::new(g(style), names::STYLE),
        WatchBinding::new(g("image/**/*.{jpg,jpeg,png,svg,gif}"), names::IMG),
        WatchBinding::new(g("script/**/*.js"), names::JS),
        WatchBinding::new(g("fonts/**/*"), names::COPY),
        WatchBinding::new(g("favicon/**/*"), names::FAVICON),
        WatchBinding::new(g("image/**/*.{jpg,jpeg,png}"), names::WEBP),
        WatchBinding::new(g("image/**/*.{jpg,jpeg,png}"), names::AVIF),
    ]
}

/// Human-readable plan for `--dry-run`.
pub fn describe(plan: &Plan, settings: &BuildSettings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "sitepipe dry-run");
    let _ = writeln!(out, "  mode = {}", plan.mode);
    let _ = writeln!(out, "  style = {:?}", settings.style);
    let _ = writeln!(out, "  src = {}", settings.layout.src.display());
    let _ = writeln!(out, "  dist = {}", settings.layout.dist.display());
    let _ = writeln!(out);

    if plan.specs.is_empty() {
        let _ = writeln!(out, "tasks: none");
    } else {
        let _ = writeln!(out, "tasks ({}):", plan.specs.len());
        for spec in &plan.specs {
            let _ = writeln!(out, "  - {}", spec.name);
            if !spec.after.is_empty() {
                let _ = writeln!(out, "      after: {}", spec.after.join(", "));
            }
        }
    }

    if plan.serve {
        let _ = writeln!(out);
        let _ = writeln!(out, "serve: {}", settings.layout.dist.display());
        let _ = writeln!(out, "watch:");
        for binding in watch_bindings(settings) {
            let _ = writeln!(out, "  - {binding}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "tools:");
    for (name, tool) in settings.tools.iter() {
        let _ = writeln!(
            out,
            "  {name}: {}",
            tool.template_for(plan.mode.is_development())
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::dag::DagGraph;

    fn names_of(plan: &Plan) -> Vec<&str> {
        plan.specs.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn build_is_clear_then_base_then_critical() {
        let plan = Plan::for_entry(Some(EntryPoint::Build), false);
        assert_eq!(plan.mode, Mode::Production);
        assert!(!plan.serve);
        assert_eq!(plan.roots(), ["clear"]);

        let graph = DagGraph::new(&plan.specs).unwrap();
        assert_eq!(graph.dependencies_of("style"), ["clear"]);
        let mut crit_deps = graph.dependencies_of("critCSS").to_vec();
        crit_deps.sort();
        let mut base: Vec<String> = names::BASE.iter().map(|s| s.to_string()).collect();
        base.sort();
        assert_eq!(crit_deps, base);
    }

    #[test]
    fn default_entry_is_develop_and_serves() {
        let plan = Plan::for_entry(None, false);
        assert_eq!(plan, Plan::for_entry(Some(EntryPoint::Develop), false));
        assert_eq!(plan.mode, Mode::Development);
        assert!(plan.serve);
        assert_eq!(plan.roots().len(), 8);
    }

    #[test]
    fn single_tasks_honour_dev_flag() {
        let prod = Plan::for_entry(Some(EntryPoint::Js), false);
        let dev = Plan::for_entry(Some(EntryPoint::Js), true);
        assert_eq!(names_of(&prod), ["js"]);
        assert_eq!(prod.mode, Mode::Production);
        assert_eq!(dev.mode, Mode::Development);
    }

    #[test]
    fn server_runs_nothing_up_front() {
        let plan = Plan::for_entry(Some(EntryPoint::Server), false);
        assert!(plan.specs.is_empty());
        assert!(plan.serve);
    }

    #[test]
    fn css_variant_watches_css_sources() {
        let mut settings =
            BuildSettings::from_config(&ConfigFile::default(), "/project", Mode::Development);
        let scss = watch_bindings(&settings);
        assert!(scss.contains(&WatchBinding::new("src/scss/**/*.scss", "style")));

        settings.style = StyleVariant::Css;
        let css = watch_bindings(&settings);
        assert!(css.contains(&WatchBinding::new("src/css/**/*.css", "style")));
        assert_eq!(css.iter().filter(|b| b.task == "avif").count(), 1);
    }

    #[test]
    fn dry_run_lists_dependencies() {
        let settings =
            BuildSettings::from_config(&ConfigFile::default(), "/project", Mode::Production);
        let text = describe(&Plan::for_entry(Some(EntryPoint::Build), false), &settings);
        assert!(text.contains("  - critCSS\n      after: html, style, js, img, avif, webp, copy, favicon"));
        assert!(!text.contains("watch:"));
    }
}
