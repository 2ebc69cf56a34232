// tests/watch_dispatch.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;

use sitepipe::engine::RuntimeEvent;
use sitepipe::tasks::composer::watch_bindings;
use sitepipe::types::Mode;
use sitepipe::watch::event_handler::process_file_change;
use sitepipe::watch::{BindingSet, ContentHashes, spawn_watcher};
use sitepipe_test_utils::builders::SiteBuilder;
use sitepipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn drain(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let RuntimeEvent::TaskTriggered { task, .. } = event {
            out.push(task);
        }
    }
    out
}

#[tokio::test]
async fn scss_change_triggers_style_only() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/scss/main.scss", "a{}")
        .build();
    let settings = site.settings(Mode::Development);
    let bindings = BindingSet::compile(&watch_bindings(&settings))?;

    let (tx, mut rx) = mpsc::channel(16);
    let mut hashes = ContentHashes::new();
    process_file_change(
        site.root(),
        &site.path("src/scss/main.scss"),
        &bindings,
        &mut hashes,
        &tx,
    )
    .await;

    assert_eq!(drain(&mut rx), ["style"]);
    Ok(())
}

#[tokio::test]
async fn raster_image_change_triggers_all_image_tasks() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/image/hero.png", "PNG")
        .file("src/image/icon.svg", "SVG")
        .build();
    let settings = site.settings(Mode::Development);
    let bindings = BindingSet::compile(&watch_bindings(&settings))?;

    let (tx, mut rx) = mpsc::channel(16);
    let mut hashes = ContentHashes::new();
    for rel in ["src/image/hero.png", "src/image/icon.svg"] {
        process_file_change(site.root(), &site.path(rel), &bindings, &mut hashes, &tx).await;
    }

    assert_eq!(drain(&mut rx), ["img", "webp", "avif", "img"]);
    Ok(())
}

#[tokio::test]
async fn nested_html_partials_trigger_html() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/partials/nav.html", "<nav></nav>")
        .build();
    let settings = site.settings(Mode::Development);
    let bindings = BindingSet::compile(&watch_bindings(&settings))?;

    assert_eq!(bindings.tasks_for("src/partials/nav.html"), ["html"]);
    assert_eq!(bindings.tasks_for("src/index.html"), ["html"]);
    assert!(bindings.tasks_for("dist/index.html").is_empty());
    Ok(())
}

#[tokio::test]
async fn real_watcher_reports_saved_file() -> TestResult {
    init_tracing();
    let site = SiteBuilder::new()
        .file("src/script/index.js", "let a;")
        .build();
    let settings = site.settings(Mode::Development);
    let bindings = BindingSet::compile(&watch_bindings(&settings))?;

    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(site.root(), site.path("src"), bindings, tx)?;

    // Give the OS watcher a moment to register.
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::fs::write(site.path("src/script/index.js"), "let b;")?;

    let task = with_timeout(async {
        loop {
            match rx.recv().await {
                Some(RuntimeEvent::TaskTriggered { task, .. }) => break Some(task),
                Some(_) => continue,
                None => break None,
            }
        }
    })
    .await;

    assert_eq!(task.as_deref(), Some("js"));
    Ok(())
}
