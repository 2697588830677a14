// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::config::validate::validate_root_name;
use crate::dag::{CLEAN, Scheduler, TaskGraph};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{PipelineError, Result};
use crate::exec::{PipelineExecutor, PreviewServer, TaskExecutor};
use crate::fs::RealFileSystem;
use crate::pipeline::{Pipeline, resolve_paths};
use crate::task::{BuildReport, TaskResult};
use crate::transform::TransformRegistry;
use crate::watch::{
    CommandReload, Coordinator, LogReload, ReloadNotifier, ServiceOptions, compile_bindings,
    default_bindings, run_coordinator, spawn_watcher,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and path resolution
/// - the pipeline (catalog, graph, runner)
/// - the selected target: `build`, `watch` or `run <task>`
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let project_dir = std::env::current_dir().context("determining current directory")?;
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;

    if let Some(root) = &args.root {
        validate_root_name(root)?;
    }
    let fallback_root = project_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let paths = resolve_paths(args.root.as_deref(), &cfg, fallback_root.as_deref());

    let pipeline = Arc::new(Pipeline::new(
        project_dir,
        paths,
        cfg,
        Arc::new(TransformRegistry::with_builtins()),
        Arc::new(RealFileSystem),
    )?);

    if args.dry_run {
        print!("{}", pipeline.plan());
        return Ok(());
    }

    match args.target() {
        Command::Build => {
            let report = build(pipeline).await?;
            finish(&report)?;
        }
        Command::Run { task } => {
            let report = run_task(&pipeline, &task).await?;
            finish(&report)?;
        }
        Command::Watch => watch(pipeline).await?,
    }

    Ok(())
}

/// Print the summary; a failed build becomes an error (exit code 1).
fn finish(report: &BuildReport) -> Result<()> {
    println!("{report}");
    if report.is_success() {
        Ok(())
    } else {
        Err(PipelineError::BuildFailed(report.problem_count()))
    }
}

/// Run `clean`, then every build task as soon as its dependencies succeed.
pub async fn build(pipeline: Arc<Pipeline>) -> Result<BuildReport> {
    let graph = pipeline.graph().clone();
    run_build(&graph, move |tx| PipelineExecutor::new(pipeline, tx)).await
}

/// Drive one full build over `graph` with the executor built by
/// `make_executor`, which receives the sender for completion events.
///
/// Ctrl-C stops the build early with [`PipelineError::Interrupted`].
pub async fn run_build<E, F>(graph: &TaskGraph, make_executor: F) -> Result<BuildReport>
where
    E: TaskExecutor,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    run_build_until(graph, make_executor, ctrl_c()).await
}

/// Resolves on Ctrl-C. Never resolves when the signal cannot be listened for.
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received; stopping the build"),
        Err(err) => {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// [`run_build`] with an explicit stop signal: once `shutdown` resolves the
/// runtime gets [`RuntimeEvent::ShutdownRequested`], running tasks are
/// abandoned and the build fails with [`PipelineError::Interrupted`].
pub async fn run_build_until<E, F, S>(
    graph: &TaskGraph,
    make_executor: F,
    shutdown: S,
) -> Result<BuildReport>
where
    E: TaskExecutor,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
    S: Future<Output = ()> + Send + 'static,
{
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(rt_tx.clone());

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: CLEAN.to_string(),
        })
        .await
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("runtime channel closed: {e}")))?;

    let stop_tx = rt_tx.clone();
    let stopper = tokio::spawn(async move {
        shutdown.await;
        let _ = stop_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    let scheduler = Scheduler::from_graph(graph);
    let expected = scheduler.task_names().count();
    let core = CoreRuntime::new(
        scheduler,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let result = Runtime::new(core, rt_rx, executor).run().await;
    stopper.abort();
    let report = result?;

    if report.len() < expected {
        warn!(finished = report.len(), expected, "build interrupted");
        return Err(PipelineError::Interrupted(report.len()));
    }

    if report.is_success() {
        info!(tasks = report.len(), "build succeeded");
    } else {
        for (path, tasks) in report.overlapping_outputs() {
            error!(?path, ?tasks, "output written by more than one task");
        }
        error!(problems = report.problem_count(), "build failed");
    }
    Ok(report)
}

/// Run a single task without `clean`.
pub async fn run_task(pipeline: &Pipeline, name: &str) -> Result<BuildReport> {
    if pipeline.task(name).is_none() {
        return Err(PipelineError::TaskNotFound(name.to_string()));
    }

    let result = match pipeline.execute(name).await {
        Ok(report) => TaskResult::Succeeded(report),
        Err(err) => {
            error!(task = %name, error = %err, "task failed");
            TaskResult::Failed(err)
        }
    };

    let mut report = BuildReport::new();
    report.record(name, result);
    Ok(report)
}

/// `serve` and `build` side by side until Ctrl-C.
///
/// A failed build is reported and watching continues.
pub async fn watch(pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let initial = {
        let pipeline = Arc::clone(&pipeline);
        async move {
            match build(pipeline).await {
                Ok(report) => {
                    println!("{report}");
                    if !report.is_success() {
                        warn!("initial build failed; still watching");
                    }
                }
                Err(err) => error!(error = %err, "initial build could not run"),
            }
        }
    };

    tokio::select! {
        (_, served) = async { tokio::join!(initial, serve(pipeline)) } => served,
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("shutting down");
            Ok(())
        }
    }
}

/// Preview server plus rebuild-on-change.
pub async fn serve(pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let cfg = pipeline.config();
    let project_dir = pipeline.project_dir().to_path_buf();

    let mut preview = match &cfg.serve.cmd {
        Some(cmd) => Some(PreviewServer::start(
            cmd,
            pipeline.paths().root_name(),
            &project_dir,
        )?),
        None => None,
    };

    let notifier: Arc<dyn ReloadNotifier> = match &cfg.serve.reload_cmd {
        Some(cmd) => Arc::new(CommandReload::new(cmd.clone(), project_dir.clone())),
        None => Arc::new(LogReload),
    };

    let bindings = compile_bindings(default_bindings(pipeline.paths(), pipeline.tasks()))?;
    let coordinator = Coordinator::new(bindings, cfg.debounce());
    let options = ServiceOptions {
        use_hash: cfg.watch.use_hash,
    };

    let (changes_tx, changes_rx) = mpsc::channel(256);
    let watch_dir = project_dir.join(pipeline.paths().source_dir());
    let _watcher = spawn_watcher(&project_dir, &watch_dir, changes_tx)?;

    let service = run_coordinator(
        coordinator,
        changes_rx,
        Arc::clone(&pipeline),
        notifier,
        options,
    );
    tokio::pin!(service);

    if let Some(server) = preview.as_mut() {
        tokio::select! {
            res = &mut service => return res,
            status = server.wait() => match status {
                Ok(status) => warn!(%status, "preview server exited; still watching"),
                Err(err) => warn!(error = %format!("{err:#}"), "preview server lost"),
            },
        }
    }

    service.await
}
