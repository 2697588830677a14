// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::{SERVE, TaskGraph};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{RunLedger, deps_satisfied};
use crate::dag::task_info::{ScheduledTask, TaskRunState, TaskSlot};
use crate::engine::TaskOutcome;
use crate::types::TaskName;

/// Per-run state machine over an immutable [`TaskGraph`].
///
/// A run starts with the first trigger while idle and ends once no
/// participating task is pending or running. Success releases dependents;
/// failure skips everything downstream for the rest of the run.
///
/// `serve` gets no slot; the watch service owns it.
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    slots: BTreeMap<TaskName, TaskSlot>,
    runs_started: u64,
    active_run: Option<u64>,
}

impl Scheduler {
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let slots = graph
            .tasks()
            .filter(|name| *name != SERVE)
            .map(|name| {
                let slot = TaskSlot::new(name, graph.dependencies_of(name).to_vec());
                (name.to_string(), slot)
            })
            .collect();

        Self {
            graph: graph.clone(),
            slots,
            runs_started: 0,
            active_run: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_run.is_none()
    }

    /// `None` for names without a slot (unknown tasks and `serve`).
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.slots.get(task).map(|slot| slot.state)
    }

    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let slot = self.slots.get(task)?;
        Some(deps_satisfied(&self.slots, slot))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.slots.contains_key(task)
    }

    /// Schedulable task names (`clean` and build tasks), sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Open a new run. States from the previous run are cleared.
    pub fn start_new_run(&mut self) {
        self.runs_started += 1;
        self.active_run = Some(self.runs_started);
        for slot in self.slots.values_mut() {
            slot.state = TaskRunState::NotInRun;
        }
        debug!(run_id = self.runs_started, "run opened");
    }

    /// Enlist `task` and its downstream in the run (opening one if idle) and
    /// dispatch whatever is ready.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        let run_id = match self.active_run {
            Some(id) => id,
            None => {
                self.start_new_run();
                self.runs_started
            }
        };

        let known = self.slots.contains_key(task);
        let mut ledger = RunLedger::new(&self.graph, &mut self.slots, run_id);
        if known {
            ledger.enlist(task);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }
        let newly_scheduled = ledger.dispatch_ready();

        SchedulerStep {
            newly_scheduled,
            run_just_finished: self.close_run_if_settled(),
            ..SchedulerStep::default()
        }
    }

    /// Record the outcome of a running task.
    pub fn step_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let Some(slot) = self.slots.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return SchedulerStep::default();
        };

        if slot.state != TaskRunState::Running {
            warn!(task = %task, state = ?slot.state, "completion for a task that is not running; ignoring");
            return SchedulerStep::default();
        }

        let mut step = SchedulerStep::default();
        match outcome {
            TaskOutcome::Success(_) => {
                slot.state = TaskRunState::DoneSuccess;
                step.newly_scheduled =
                    RunLedger::new(&self.graph, &mut self.slots, run_id).dispatch_ready();
            }
            TaskOutcome::Failed(err) => {
                slot.state = TaskRunState::DoneFailed;
                warn!(task = %task, run_id, error = %err, "task failed; skipping its dependents");
                step.newly_failed.push(task.to_string());
                step.newly_skipped = RunLedger::new(&self.graph, &mut self.slots, run_id)
                    .skip_downstream_of(task)
                    .into_iter()
                    .map(|skipped| (skipped, task.to_string()))
                    .collect();
            }
        }

        step.run_just_finished = self.close_run_if_settled();
        step
    }

    /// Returns `true` when this call ended the active run.
    fn close_run_if_settled(&mut self) -> bool {
        let Some(run_id) = self.active_run else {
            return false;
        };
        if !RunLedger::new(&self.graph, &mut self.slots, run_id).is_settled() {
            return false;
        }
        info!(run_id, "run finished");
        self.active_run = None;
        true
    }
}
