// src/tasks/critical.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::engine::TaskOutcome;
use crate::pipeline::SourceSet;
use crate::pipeline::command::{ToolInput, ToolRun};
use crate::settings::BuildSettings;

/// Inlines above-the-fold CSS into every emitted top-level page.
///
/// Never fails: per-page problems become diagnostics.
#[derive(Debug, Clone)]
pub struct CriticalCss {
    settings: Arc<BuildSettings>,
}

impl CriticalCss {
    pub fn new(settings: Arc<BuildSettings>) -> Self {
        Self { settings }
    }

    fn stylesheet(&self) -> PathBuf {
        self.settings
            .layout
            .dist
            .join(&self.settings.primary_stylesheet)
    }

    pub async fn run(&self) -> TaskOutcome {
        let mut diagnostics = Vec::new();

        let pages = match SourceSet::new(&self.settings.layout.dist, ["*.html"]).select() {
            Ok(pages) => pages,
            Err(err) => {
                let msg = format!("listing pages: {err:#}");
                warn!("{msg}");
                return TaskOutcome::Degraded(vec![msg]);
            }
        };

        if pages.is_empty() {
            debug!("no pages to process");
            return TaskOutcome::Success;
        }

        let css = self.stylesheet();
        if !css.is_file() {
            let msg = format!("stylesheet {} not found; pages left as emitted", css.display());
            warn!("{msg}");
            diagnostics.push(msg);
            return TaskOutcome::from_diagnostics(diagnostics);
        }

        for (page, rel) in pages {
            match self.process(&page).await {
                Ok(()) => debug!(page = %rel.display(), "critical css inlined"),
                Err(err) => {
                    let msg = format!("{}: {err:#}", rel.display());
                    warn!("critical css failed for {msg}");
                    diagnostics.push(msg);
                }
            }
        }

        TaskOutcome::from_diagnostics(diagnostics)
    }

    async fn process(&self, page: &Path) -> Result<()> {
        let tool = &self.settings.tools.critical;
        let template = tool.template_for(self.settings.is_development());
        let mut run = ToolRun::new("critical", template, ToolInput::File(page))
            .var("source", page)
            .var("base", &self.settings.layout.dist)
            .var("css", self.stylesheet());
        if let Some(dir) = page.parent() {
            run = run.var("dir", dir);
        }
        run.input_ext = Some("html");
        run.output_ext = Some("html");

        let html = run.run().await?;
        tokio::fs::write(page, html)
            .await
            .with_context(|| format!("writing {}", page.display()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, ToolConfig};
    use crate::types::Mode;
    use std::fs;

    fn settings(root: &Path, cmd: &str) -> Arc<BuildSettings> {
        let mut s = BuildSettings::from_config(&ConfigFile::default(), root, Mode::Production);
        s.tools.critical = ToolConfig::new(cmd);
        Arc::new(s)
    }

    #[tokio::test]
    async fn one_failing_page_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        fs::create_dir_all(dist.join("css")).unwrap();
        fs::write(dist.join("css/index.css"), "a{}").unwrap();
        fs::write(dist.join("about.html"), "BAD").unwrap();
        fs::write(dist.join("index.html"), "<p>ok</p>").unwrap();

        let cmd = "if grep -q BAD {input}; then exit 2; fi; printf '<style>a{}</style>'; cat {input}";
        let outcome = CriticalCss::new(settings(dir.path(), cmd)).run().await;

        match outcome {
            TaskOutcome::Degraded(d) => {
                assert_eq!(d.len(), 1);
                assert!(d[0].contains("about.html"));
            }
            other => panic!("expected degraded, got {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(dist.join("index.html")).unwrap(),
            "<style>a{}</style><p>ok</p>"
        );
        assert_eq!(fs::read_to_string(dist.join("about.html")).unwrap(), "BAD");
    }

    #[tokio::test]
    async fn missing_stylesheet_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/index.html"), "x").unwrap();

        let outcome = CriticalCss::new(settings(dir.path(), "exit 1")).run().await;
        assert!(outcome.is_ok());
        assert!(matches!(outcome, TaskOutcome::Degraded(_)));
    }
}
