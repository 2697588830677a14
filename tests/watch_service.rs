// tests/watch_service.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use assetpipe::config::ConfigFile;
use assetpipe::fs::FileSystem;
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::pipeline::{Pipeline, resolve_paths};
use assetpipe::types::BoxFuture;
use assetpipe::watch::{
    ChangeEvent, ChannelReload, Coordinator, CoordinatorCommand, ReloadNotifier, RunOutcome,
    ServiceOptions, SlotState, compile_bindings, default_bindings, run_coordinator,
};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::fake_tools::{SYNTAX_ERROR, TOOL_CRASH, fake_tool_registry};
use assetpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(40);

fn pipeline(fs: &MockFileSystem, cfg: ConfigFile) -> Arc<Pipeline> {
    let paths = resolve_paths(Some("site"), &cfg, None);
    Arc::new(
        Pipeline::new(
            "",
            paths,
            cfg,
            Arc::new(fake_tool_registry()),
            Arc::new(fs.clone()),
        )
        .unwrap(),
    )
}

fn coordinator(pipeline: &Pipeline) -> Coordinator {
    let bindings = compile_bindings(default_bindings(pipeline.paths(), pipeline.tasks())).unwrap();
    Coordinator::new(bindings, DEBOUNCE)
}

struct Harness {
    changes: mpsc::Sender<ChangeEvent>,
    reloads: mpsc::UnboundedReceiver<String>,
    service: JoinHandle<anyhow::Result<()>>,
}

fn start(pipeline: Arc<Pipeline>, options: ServiceOptions) -> Harness {
    let (notifier, reloads) = ChannelReload::new();
    let (changes, changes_rx) = mpsc::channel(64);
    let coordinator = coordinator(&pipeline);
    let service = tokio::spawn(run_coordinator(
        coordinator,
        changes_rx,
        pipeline,
        Arc::new(notifier),
        options,
    ));
    Harness {
        changes,
        reloads,
        service,
    }
}

impl Harness {
    async fn touch(&self, path: &str) {
        self.changes.send(ChangeEvent::new(path)).await.unwrap();
    }

    async fn next_reload(&mut self) -> Option<String> {
        timeout(Duration::from_secs(2), self.reloads.recv())
            .await
            .ok()
            .flatten()
    }

    /// No reload arrives within a few debounce windows.
    async fn quiet(&mut self) -> bool {
        timeout(DEBOUNCE * 5, self.reloads.recv()).await.is_err()
    }

    async fn stop(self) -> TestResult {
        drop(self.changes);
        timeout(Duration::from_secs(2), self.service).await???;
        Ok(())
    }
}

#[tokio::test]
async fn burst_of_edits_gives_one_rebuild_and_one_reload() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    let mut h = start(pipeline(&fs, ConfigFileBuilder::new().build()), ServiceOptions::default());

    for i in 0..5 {
        fs.add_file("app/scss/style.scss", format!("a{{z-index:{i}}}"));
        h.touch("app/scss/style.scss").await;
    }

    assert_eq!(h.next_reload().await.as_deref(), Some("css"));
    assert!(h.quiet().await);

    let css = String::from_utf8(fs.contents("site/css/style.min.css").unwrap())?;
    assert!(css.ends_with("a{z-index:4}"), "{css}");
    assert!(fs.contents("site/js/main.js").is_none());

    h.stop().await
}

#[tokio::test]
async fn partial_change_rebuilds_markup() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/index.html", "@@include('html/_nav.html')");
    fs.add_file("app/html/_nav.html", "<nav>v1</nav>");
    let mut h = start(pipeline(&fs, ConfigFileBuilder::new().build()), ServiceOptions::default());

    fs.add_file("app/html/_nav.html", "<nav>v2</nav>");
    h.touch("app/html/_nav.html").await;

    assert_eq!(h.next_reload().await.as_deref(), Some("html"));
    assert_eq!(fs.contents("site/index.html"), Some(b"<nav>v2</nav>".to_vec()));

    h.stop().await
}

#[tokio::test]
async fn failed_rebuild_keeps_watching_without_reload() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", format!("a{{ {SYNTAX_ERROR}"));
    let mut h = start(pipeline(&fs, ConfigFileBuilder::new().build()), ServiceOptions::default());

    h.touch("app/scss/style.scss").await;
    assert!(h.quiet().await);
    assert!(fs.contents("site/css/style.min.css").is_none());

    fs.add_file("app/scss/style.scss", "a{}");
    h.touch("app/scss/style.scss").await;
    assert_eq!(h.next_reload().await.as_deref(), Some("css"));
    assert!(fs.contents("site/css/style.min.css").is_some());

    h.stop().await
}

#[tokio::test]
async fn panicking_rebuild_frees_the_slot_for_the_next_change() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", TOOL_CRASH);
    let mut h = start(pipeline(&fs, ConfigFileBuilder::new().build()), ServiceOptions::default());

    h.touch("app/scss/style.scss").await;
    assert!(h.quiet().await);

    fs.add_file("app/scss/style.scss", "a{}");
    h.touch("app/scss/style.scss").await;
    assert_eq!(h.next_reload().await.as_deref(), Some("css"));
    assert!(fs.contents("site/css/style.min.css").is_some());

    h.stop().await
}

/// Records each reload, then never finishes it.
#[derive(Debug)]
struct HangingReload {
    seen: mpsc::UnboundedSender<String>,
}

impl ReloadNotifier for HangingReload {
    fn reload<'a>(&'a self, task: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let _ = self.seen.send(task.to_string());
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}

#[tokio::test]
async fn slow_reload_does_not_stall_later_rebuilds() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/scss/style.scss", "a{}");
    fs.add_file("app/js/main.js", "let a;");
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());

    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let (changes, changes_rx) = mpsc::channel(64);
    let service = tokio::spawn(run_coordinator(
        coordinator(&pipeline),
        changes_rx,
        pipeline,
        Arc::new(HangingReload { seen: seen_tx }),
        ServiceOptions::default(),
    ));

    changes.send(ChangeEvent::new("app/scss/style.scss")).await?;
    let first = timeout(Duration::from_secs(2), seen.recv()).await?;
    assert_eq!(first.as_deref(), Some("css"));

    changes.send(ChangeEvent::new("app/js/main.js")).await?;
    let second = timeout(Duration::from_secs(2), seen.recv()).await?;
    assert_eq!(second.as_deref(), Some("js"));
    assert!(fs.contents("site/js/main.js").is_some());

    drop(changes);
    timeout(Duration::from_secs(2), service).await???;
    Ok(())
}

#[tokio::test]
async fn unchanged_files_skip_the_rebuild_with_hashing_on() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("app/js/main.js", "let a;");
    let options = ServiceOptions { use_hash: true };
    let mut h = start(pipeline(&fs, ConfigFileBuilder::new().build()), options);

    h.touch("app/js/main.js").await;
    assert_eq!(h.next_reload().await.as_deref(), Some("js"));

    // Same contents: the run is skipped and nothing reloads.
    fs.remove_file(Path::new("site/js/main.js"))?;
    h.touch("app/js/main.js").await;
    assert!(h.quiet().await);
    assert!(fs.contents("site/js/main.js").is_none());

    fs.add_file("app/js/main.js", "let b;");
    h.touch("app/js/main.js").await;
    assert_eq!(h.next_reload().await.as_deref(), Some("js"));
    assert!(fs.contents("site/js/main.js").is_some());

    h.stop().await
}

#[test]
fn change_during_a_run_triggers_one_more_run() {
    let fs = MockFileSystem::new();
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());
    let mut c = coordinator(&pipeline);
    c.start();

    let t0 = Instant::now();
    let css = (0..c.len())
        .find(|&i| c.binding(i).is_some_and(|b| b.task() == "css"))
        .unwrap();

    c.on_change("app/scss/style.scss", t0);
    let commands = c.poll(t0 + DEBOUNCE);
    assert_eq!(
        commands,
        vec![CoordinatorCommand::RunTask {
            binding: css,
            task: "css".to_string()
        }]
    );
    assert_eq!(c.slot_state(css), Some(SlotState::Running));

    // Edit while running: nothing starts yet, and no deadline is armed.
    let t1 = t0 + DEBOUNCE * 2;
    c.on_change("app/scss/_vars.scss", t1);
    assert!(c.poll(t1 + DEBOUNCE).is_empty());
    assert_eq!(c.next_deadline(), None);

    let commands = c.on_finished(css, RunOutcome::Succeeded, t1 + DEBOUNCE);
    assert_eq!(
        commands,
        vec![CoordinatorCommand::Reload {
            task: "css".to_string()
        }]
    );

    // The pending edit is older than the window, so the rerun starts at once.
    assert_eq!(c.next_deadline(), Some(t1 + DEBOUNCE));
    let commands = c.poll(t1 + DEBOUNCE);
    assert_eq!(commands.len(), 1);

    c.on_finished(css, RunOutcome::Succeeded, t1 + DEBOUNCE * 2);
    assert!(c.poll(t1 + DEBOUNCE * 10).is_empty());
}

#[test]
fn svg_change_rebuilds_images_and_sprite() {
    let fs = MockFileSystem::new();
    let pipeline = pipeline(&fs, ConfigFileBuilder::new().build());
    let mut c = coordinator(&pipeline);
    c.start();

    let t0 = Instant::now();
    assert_eq!(c.on_change("app/images/icons/mail.svg", t0), 2);
    let mut tasks: Vec<String> = c
        .poll(t0 + DEBOUNCE)
        .into_iter()
        .filter_map(|cmd| match cmd {
            CoordinatorCommand::RunTask { task, .. } => Some(task),
            _ => None,
        })
        .collect();
    tasks.sort();
    assert_eq!(tasks, vec!["images", "sprite"]);
}
