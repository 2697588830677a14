// src/watch/service.rs

//! Async shell around the [`Coordinator`]: reads change events, sleeps
//! until the next debounce deadline, runs tasks and forwards reloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::pipeline::Pipeline;
use crate::watch::coordinator::{Coordinator, CoordinatorCommand, RunOutcome};
use crate::watch::hash::compute_hash_for_paths;
use crate::watch::patterns::CompiledBinding;
use crate::watch::reload::ReloadNotifier;
use crate::watch::watcher::ChangeEvent;

/// Knobs of the watch loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOptions {
    /// Skip runs whose watched files hash the same as after the last
    /// successful run of that binding.
    pub use_hash: bool,
}

struct Finished {
    binding: usize,
    outcome: RunOutcome,
    hash: Option<String>,
}

struct Service {
    coordinator: Coordinator,
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn ReloadNotifier>,
    options: ServiceOptions,
    last_hashes: HashMap<usize, String>,
    done_tx: mpsc::UnboundedSender<Finished>,
    in_flight: usize,
}

/// Run the watch loop until `changes` closes, then wait for in-flight runs.
///
/// Task failures are reported and never end the loop.
pub async fn run_coordinator(
    mut coordinator: Coordinator,
    mut changes: mpsc::Receiver<ChangeEvent>,
    pipeline: Arc<Pipeline>,
    notifier: Arc<dyn ReloadNotifier>,
    options: ServiceOptions,
) -> Result<()> {
    coordinator.start();
    info!(
        bindings = coordinator.len(),
        debounce_ms = coordinator.debounce().as_millis() as u64,
        "watching for changes"
    );

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();
    let mut service = Service {
        coordinator,
        pipeline,
        notifier,
        options,
        last_hashes: HashMap::new(),
        done_tx,
        in_flight: 0,
    };

    loop {
        let deadline = service.coordinator.next_deadline();

        tokio::select! {
            change = changes.recv() => match change {
                Some(event) => {
                    service.coordinator.on_change(&event.path, Instant::now());
                }
                None => {
                    debug!("change channel closed");
                    break;
                }
            },
            Some(done) = done_rx.recv() => {
                service.finish(done);
            }
            _ = sleep_until(deadline) => {}
        }

        let commands = service.coordinator.poll(Instant::now());
        service.dispatch(commands);
    }

    while service.in_flight > 0 {
        match done_rx.recv().await {
            Some(done) => service.finish(done),
            None => break,
        }
    }

    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending::<()>().await,
    }
}

impl Service {
    fn finish(&mut self, done: Finished) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if done.outcome == RunOutcome::Succeeded
            && let Some(hash) = done.hash
        {
            self.last_hashes.insert(done.binding, hash);
        }

        let commands = self
            .coordinator
            .on_finished(done.binding, done.outcome, Instant::now());
        self.dispatch(commands);
    }

    fn dispatch(&mut self, commands: Vec<CoordinatorCommand>) {
        for command in commands {
            match command {
                CoordinatorCommand::RunTask { binding, task } => self.spawn_run(binding, task),
                CoordinatorCommand::Reload { task } => self.spawn_reload(task),
                CoordinatorCommand::ReportFailure { task, message } => {
                    error!(task = %task, "rebuild failed: {message}");
                }
            }
        }
    }

    /// The notifier may run an external command; it must not hold up
    /// change intake.
    fn spawn_reload(&self, task: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = notifier.reload(&task).await {
                warn!(task = %task, error = %format!("{err:#}"), "reload failed");
            }
        });
    }

    fn spawn_run(&mut self, binding: usize, task: String) {
        let Some(compiled) = self.coordinator.binding(binding).cloned() else {
            return;
        };
        let pipeline = Arc::clone(&self.pipeline);
        let done_tx = self.done_tx.clone();
        let previous = self.last_hashes.get(&binding).cloned();
        let use_hash = self.options.use_hash;

        self.in_flight += 1;
        tokio::spawn(async move {
            let hash = if use_hash {
                binding_hash(&pipeline, &compiled)
            } else {
                None
            };

            let outcome = if hash.is_some() && hash == previous {
                debug!(task = %task, "watched files unchanged; skipping run");
                RunOutcome::Unchanged
            } else {
                match pipeline.execute_isolated(&task).await {
                    Ok(report) => {
                        info!(
                            task = %task,
                            outputs = report.outputs.len(),
                            "rebuilt"
                        );
                        RunOutcome::Succeeded
                    }
                    Err(err) => RunOutcome::Failed(err.to_string()),
                }
            };

            let _ = done_tx.send(Finished {
                binding,
                outcome,
                hash,
            });
        });
    }
}

fn binding_hash(pipeline: &Pipeline, binding: &CompiledBinding) -> Option<String> {
    let fs = pipeline.fs().as_ref();
    let result = binding
        .matching_files(fs, pipeline.project_dir())
        .and_then(|files| compute_hash_for_paths(fs, &files));

    match result {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(task = %binding.task(), error = %format!("{err:#}"), "hashing watched files failed");
            None
        }
    }
}
