// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod settings;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::dag::{DagGraph, Scheduler, TaskSpec};
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::errors::SitepipeError;
use crate::exec::RealExecutorBackend;
use crate::serve::LiveReload;
use crate::settings::BuildSettings;
use crate::tasks::{Plan, TaskRegistry, composer};
use crate::watch::BindingSet;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the entry point's plan
/// - the one-shot task DAG (scheduler / runtime / executor)
/// - (optional) the watch server: HTTP, live reload, file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let root = config_root_dir(&config_path);

    let plan = Plan::for_entry(args.task, args.dev);
    let settings = Arc::new(BuildSettings::from_config(&cfg, root, plan.mode));

    if args.dry_run {
        print!("{}", composer::describe(&plan, &settings));
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let reload = LiveReload::new();
    let registry = tasks::registry(&settings, &reload);

    if !plan.specs.is_empty() {
        let report = run_dag(&plan.specs, plan.roots(), registry.clone(), settings.queue_length).await?;
        log_report(&report);
        if !report.is_success() {
            let failed: Vec<&str> = report.failures().into_iter().map(|(t, _)| t).collect();
            return Err(SitepipeError::BuildFailed(format!("failed tasks: {}", failed.join(", "))).into());
        }
    }

    if plan.serve {
        serve_and_watch(&settings, registry, reload).await?;
    }

    Ok(())
}

/// Run `specs` once, starting from `triggers`, until every task reached a
/// terminal state.
pub async fn run_dag(
    specs: &[TaskSpec],
    triggers: Vec<TaskName>,
    registry: TaskRegistry,
    queue_length: usize,
) -> errors::Result<RunReport> {
    let graph = DagGraph::new(specs)?;
    let scheduler = Scheduler::new(graph);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(registry, rt_tx.clone());

    info!(?triggers, "starting tasks");
    for task in triggers {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await
            .map_err(|e| SitepipeError::Other(anyhow::anyhow!("runtime channel closed: {e}")))?;
    }

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let core = CoreRuntime::new(scheduler, queue_length, options);
    Runtime::new(core, rt_rx, executor).run().await
}

/// Serve the output directory and rebuild on source changes until Ctrl-C.
async fn serve_and_watch(
    settings: &Arc<BuildSettings>,
    registry: TaskRegistry,
    reload: LiveReload,
) -> Result<()> {
    let addr = settings.server_addr()?;
    let server = serve::start(settings.layout.dist.clone(), addr, reload)
        .await
        .map_err(|e| SitepipeError::ServerError(format!("{e:#}")))?;

    let graph = DagGraph::new(&composer::watch_specs())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let bindings = BindingSet::compile(&composer::watch_bindings(settings))?;
    let _watcher = match watch::spawn_watcher(
        &settings.layout.root,
        &settings.layout.src,
        bindings,
        rt_tx.clone(),
    ) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "file watching disabled");
            None
        }
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let executor = RealExecutorBackend::new(registry, rt_tx);
    let options = RuntimeOptions {
        exit_when_idle: false,
    };
    let core = CoreRuntime::new(Scheduler::new(graph), settings.queue_length, options);

    info!(addr = %server.local_addr, "watching for changes; press Ctrl-C to stop");
    Runtime::new(core, rt_rx, executor).run().await?;

    server.task.abort();
    info!("watch server stopped");
    Ok(())
}

fn log_report(report: &RunReport) {
    for (task, message) in report.failures() {
        error!(task = %task, "{message}");
    }
    for task in &report.skipped {
        warn!(task = %task, "skipped because an upstream task failed");
    }
    info!(
        tasks = report.outcomes.len(),
        failed = report.failures().len(),
        skipped = report.skipped.len(),
        "run finished"
    );
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitepipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitepipe.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
