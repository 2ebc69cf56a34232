// src/pipeline/mod.rs

//! Transformers: glob-select source files, run them through an ordered chain
//! of steps and write the results under the output directory.
//!
//! - [`asset`] selects sources and holds file contents in flight.
//! - [`step`] defines the steps (native transforms, external tools, bundling).
//! - [`command`] runs external tools.
//! - [`native`] implements the in-process text transforms.
//! - [`catalog`] wires up the concrete transformers for a `BuildSettings`.

pub mod asset;
pub mod catalog;
pub mod command;
pub mod native;
pub mod step;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::engine::TaskOutcome;
use crate::serve::reload::{LiveReload, ReloadEvent};
use crate::settings::BuildSettings;

pub use asset::{Asset, SourceSet};
pub use step::{AssetFilter, Step, ToolStep};

/// What happens when a step fails for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// The whole task fails.
    FailTask,
    /// The file is dropped, the failure becomes a diagnostic.
    ReportAndContinue,
}

/// Which live-reload message a finished transformer sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    Page,
    /// Refresh each written stylesheet in place.
    Stylesheet,
}

#[derive(Debug)]
pub struct Transformer {
    name: &'static str,
    sources: SourceSet,
    steps: Vec<Step>,
    dest: PathBuf,
    policy: ErrorPolicy,
    reload_kind: ReloadKind,
    settings: Arc<BuildSettings>,
    reload: LiveReload,
}

impl Transformer {
    pub fn new(
        name: &'static str,
        sources: SourceSet,
        dest: impl Into<PathBuf>,
        settings: Arc<BuildSettings>,
        reload: LiveReload,
    ) -> Self {
        Self {
            name,
            sources,
            steps: Vec::new(),
            dest: dest.into(),
            policy: ErrorPolicy::FailTask,
            reload_kind: ReloadKind::Page,
            settings,
            reload,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reload_kind(mut self, kind: ReloadKind) -> Self {
        self.reload_kind = kind;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn run(&self) -> TaskOutcome {
        match self.execute().await {
            Ok(diagnostics) => TaskOutcome::from_diagnostics(diagnostics),
            Err(err) => TaskOutcome::Failed(format!("{err:#}")),
        }
    }

    async fn execute(&self) -> Result<Vec<String>> {
        let selected = self.sources.select()?;
        if selected.is_empty() {
            debug!(task = self.name, base = %self.sources.base().display(), "no sources matched");
            return Ok(Vec::new());
        }

        let mut assets = Vec::with_capacity(selected.len());
        for (source, rel_path) in selected {
            let contents = tokio::fs::read(&source)
                .await
                .with_context(|| format!("reading {}", source.display()))?;
            assets.push(Asset {
                rel_path,
                source,
                contents,
            });
        }

        let mut diagnostics = Vec::new();
        for step in &self.steps {
            assets = if step.is_collective() {
                match step.apply_all(assets, &self.settings).await {
                    Ok(out) => out,
                    Err(err) => {
                        self.step_failed(step, "bundle", err, &mut diagnostics)?;
                        Vec::new()
                    }
                }
            } else {
                let mut out = Vec::with_capacity(assets.len());
                for asset in assets {
                    let subject = asset.rel_str();
                    match step.apply(asset, &self.settings).await {
                        Ok(next) => out.push(next),
                        Err(err) => self.step_failed(step, &subject, err, &mut diagnostics)?,
                    }
                }
                out
            };
        }

        self.write_outputs(&assets).await?;
        self.notify(&assets);
        Ok(diagnostics)
    }

    fn step_failed(
        &self,
        step: &Step,
        subject: &str,
        err: anyhow::Error,
        diagnostics: &mut Vec<String>,
    ) -> Result<()> {
        match self.policy {
            ErrorPolicy::FailTask => Err(err.context(format!("{step} failed on {subject}"))),
            ErrorPolicy::ReportAndContinue => {
                let msg = format!("{step} failed on {subject}: {err:#}");
                warn!(task = self.name, "{msg}");
                diagnostics.push(msg);
                Ok(())
            }
        }
    }

    async fn write_outputs(&self, assets: &[Asset]) -> Result<()> {
        for asset in assets {
            let path = self.dest.join(&asset.rel_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            tokio::fs::write(&path, &asset.contents)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }
        debug!(task = self.name, files = assets.len(), dest = %self.dest.display(), "wrote outputs");
        Ok(())
    }

    fn notify(&self, assets: &[Asset]) {
        if assets.is_empty() {
            return;
        }
        match self.reload_kind {
            ReloadKind::Page => self.reload.notify(ReloadEvent::Reload),
            ReloadKind::Stylesheet => {
                let dist = &self.settings.layout.dist;
                for asset in assets {
                    let full = self.dest.join(&asset.rel_path);
                    let rel = full.strip_prefix(dist).unwrap_or(&asset.rel_path);
                    self.reload.notify(ReloadEvent::Css {
                        path: rel.to_string_lossy().replace('\\', "/"),
                    });
                }
            }
        }
    }
}
