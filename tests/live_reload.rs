// tests/live_reload.rs
//
// Watch-mode runs end to end: a source edit goes through the watcher, the
// runtime and the real task registry, and reaches browsers over the live
// reload socket.

#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use sitepipe::dag::{DagGraph, Scheduler, TaskSpec};
use sitepipe::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use sitepipe::exec::RealExecutorBackend;
use sitepipe::serve::{self, LiveReload};
use sitepipe::tasks::{self, composer};
use sitepipe::types::Mode;
use sitepipe::watch::{BindingSet, spawn_watcher};
use sitepipe::run_dag;
use sitepipe_test_utils::builders::SiteBuilder;
use sitepipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn rebuilt_stylesheet_is_pushed_to_connected_browsers() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/scss/index.scss", "body {\n  color: red;\n}\n")
        .build();
    let settings = site.settings(Mode::Development);
    let reload = LiveReload::new();

    let server = serve::start(
        settings.layout.dist.clone(),
        "127.0.0.1:0".parse()?,
        reload.clone(),
    )
    .await?;
    let url = format!("ws://{}/__sitepipe/livereload", server.local_addr);
    let (mut socket, _) = with_timeout(connect_async(url)).await?;

    let registry = tasks::registry(&settings, &reload);
    let report = with_timeout(run_dag(
        &[TaskSpec::new(tasks::names::STYLE)],
        vec![tasks::names::STYLE.to_string()],
        registry,
        1,
    ))
    .await?;
    assert!(report.is_success(), "{report:?}");

    let text = with_timeout(async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => break Some(text.as_str().to_owned()),
                Some(Ok(_)) => continue,
                _ => break None,
            }
        }
    })
    .await;
    assert_eq!(text.as_deref(), Some(r#"{"kind":"css","path":"css/index.css"}"#));

    server.task.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scss_edit_rebuilds_only_the_stylesheet() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/scss/main.scss", "a {\n  color: red;\n}\n")
        .file("src/script/index.js", "let a = 1;")
        .file("src/image/hero.png", "PNG")
        .build();
    let settings = site.settings(Mode::Development);
    let reload = LiveReload::new();

    let graph = DagGraph::new(&composer::watch_specs())?;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let bindings = BindingSet::compile(&composer::watch_bindings(&settings))?;
    let _watcher = spawn_watcher(
        &settings.layout.root,
        &settings.layout.src,
        bindings,
        rt_tx.clone(),
    )?;

    let executor = RealExecutorBackend::new(tasks::registry(&settings, &reload), rt_tx.clone());
    let core = CoreRuntime::new(
        Scheduler::new(graph),
        settings.queue_length,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let runtime = tokio::spawn(Runtime::new(core, rt_rx, executor).run());

    // Give the OS watcher a moment to register.
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(site.path("src/scss/main.scss"), "main {\n  color: red;\n}\n")?;

    with_timeout(async {
        let rebuilt = || std::fs::read_to_string(site.path("dist/css/main.css")).unwrap_or_default();
        while !rebuilt().contains("main{color:red}") {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    let report = with_timeout(runtime).await??;

    assert!(report.is_success(), "{report:?}");
    assert!(!site.exists("dist/script"));
    assert!(!site.exists("dist/image"));
    Ok(())
}
