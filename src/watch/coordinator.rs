// src/watch/coordinator.rs

//! Pure debounce/coalesce state machine behind `watch`.
//!
//! The coordinator never sleeps or spawns: the caller feeds it changes and
//! completions together with the current [`Instant`], asks it what to do via
//! [`Coordinator::poll`], and sleeps until [`Coordinator::next_deadline`].
//! This keeps every timing rule testable with synthetic instants.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::types::TaskName;
use crate::watch::patterns::CompiledBinding;

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Watching,
}

/// State of one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Watching,
    Running,
}

/// How a triggered run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed(String),
    /// Skipped because the watched files hash the same as after the last
    /// successful run.
    Unchanged,
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// Run the binding's task, then report back through `on_finished`.
    RunTask { binding: usize, task: TaskName },
    /// Tell the preview to reload.
    Reload { task: TaskName },
    /// Surface a failed run; no reload follows.
    ReportFailure { task: TaskName, message: String },
}

#[derive(Debug)]
struct Slot {
    binding: CompiledBinding,
    state: SlotState,
    /// Time of the latest change not yet covered by a run.
    last_change: Option<Instant>,
}

/// Debouncing coordinator over a fixed set of bindings.
#[derive(Debug)]
pub struct Coordinator {
    phase: Phase,
    debounce: Duration,
    slots: Vec<Slot>,
}

impl Coordinator {
    pub fn new(bindings: Vec<CompiledBinding>, debounce: Duration) -> Self {
        let slots = bindings
            .into_iter()
            .map(|binding| Slot {
                binding,
                state: SlotState::Watching,
                last_change: None,
            })
            .collect();

        Self {
            phase: Phase::Idle,
            debounce,
            slots,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn binding(&self, index: usize) -> Option<&CompiledBinding> {
        self.slots.get(index).map(|s| &s.binding)
    }

    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|s| s.state)
    }

    /// `Idle → Watching`. Changes reported before this are ignored.
    pub fn start(&mut self) {
        self.phase = Phase::Watching;
    }

    /// Record a change to `rel_path` at `now`.
    ///
    /// Every matching binding restarts its debounce window, running or not.
    /// Returns how many bindings matched.
    pub fn on_change(&mut self, rel_path: &str, now: Instant) -> usize {
        if self.phase == Phase::Idle {
            trace!(path = %rel_path, "change before watching started; ignored");
            return 0;
        }

        let mut matched = 0;
        for slot in &mut self.slots {
            if slot.binding.matches(rel_path) {
                slot.last_change = Some(now);
                matched += 1;
                debug!(
                    task = %slot.binding.task(),
                    path = %rel_path,
                    running = slot.state == SlotState::Running,
                    "change recorded"
                );
            }
        }
        matched
    }

    /// Start every binding whose latest change is at least one debounce
    /// window old and which is not already running.
    pub fn poll(&mut self, now: Instant) -> Vec<CoordinatorCommand> {
        let mut commands = Vec::new();
        if self.phase == Phase::Idle {
            return commands;
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.state == SlotState::Running {
                continue;
            }
            let Some(changed) = slot.last_change else {
                continue;
            };
            if now.saturating_duration_since(changed) < self.debounce {
                continue;
            }

            slot.state = SlotState::Running;
            slot.last_change = None;
            commands.push(CoordinatorCommand::RunTask {
                binding: index,
                task: slot.binding.task().to_string(),
            });
        }

        commands
    }

    /// A run started by `RunTask` ended.
    ///
    /// Changes recorded while it ran stay pending, so the next `poll` once
    /// their window expires re-runs the task on the latest state.
    pub fn on_finished(
        &mut self,
        binding: usize,
        outcome: RunOutcome,
        _now: Instant,
    ) -> Vec<CoordinatorCommand> {
        let Some(slot) = self.slots.get_mut(binding) else {
            return Vec::new();
        };
        if slot.state != SlotState::Running {
            debug!(task = %slot.binding.task(), "finish for a binding that was not running");
            return Vec::new();
        }
        slot.state = SlotState::Watching;

        let task = slot.binding.task().to_string();
        match outcome {
            RunOutcome::Succeeded if slot.binding.binding().notify_on_complete => {
                vec![CoordinatorCommand::Reload { task }]
            }
            RunOutcome::Succeeded | RunOutcome::Unchanged => Vec::new(),
            RunOutcome::Failed(message) => {
                vec![CoordinatorCommand::ReportFailure { task, message }]
            }
        }
    }

    /// Earliest instant at which `poll` may start something.
    ///
    /// Running bindings are excluded: they only become eligible after
    /// `on_finished`.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.phase == Phase::Idle {
            return None;
        }
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Watching)
            .filter_map(|s| s.last_change)
            .map(|changed| changed + self.debounce)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::patterns::WatchBinding;

    fn coordinator(debounce_ms: u64) -> Coordinator {
        let bindings = vec![
            CompiledBinding::compile(WatchBinding::new("css", vec!["app/scss/**/*.scss".into()]))
                .unwrap(),
            CompiledBinding::compile(WatchBinding::new("js", vec!["app/js/**/*.js".into()]))
                .unwrap(),
        ];
        let mut c = Coordinator::new(bindings, Duration::from_millis(debounce_ms));
        c.start();
        c
    }

    fn ms(base: Instant, n: u64) -> Instant {
        base + Duration::from_millis(n)
    }

    #[test]
    fn changes_are_ignored_until_started() {
        let bindings = vec![
            CompiledBinding::compile(WatchBinding::new("css", vec!["**/*.scss".into()])).unwrap(),
        ];
        let mut c = Coordinator::new(bindings, Duration::from_millis(10));
        let t0 = Instant::now();
        assert_eq!(c.on_change("a.scss", t0), 0);
        assert!(c.poll(ms(t0, 100)).is_empty());
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn debounce_window_restarts_on_each_change() {
        let mut c = coordinator(200);
        let t0 = Instant::now();

        c.on_change("app/scss/style.scss", t0);
        c.on_change("app/scss/style.scss", ms(t0, 150));
        assert!(c.poll(ms(t0, 250)).is_empty());
        assert_eq!(c.next_deadline(), Some(ms(t0, 350)));

        let cmds = c.poll(ms(t0, 350));
        assert_eq!(
            cmds,
            vec![CoordinatorCommand::RunTask {
                binding: 0,
                task: "css".into()
            }]
        );
        assert_eq!(c.slot_state(0), Some(SlotState::Running));
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn only_matching_bindings_run() {
        let mut c = coordinator(10);
        let t0 = Instant::now();
        assert_eq!(c.on_change("app/js/main.js", t0), 1);
        assert_eq!(c.on_change("README.md", t0), 0);

        let cmds = c.poll(ms(t0, 10));
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], CoordinatorCommand::RunTask { task, .. } if task == "js"));
    }

    #[test]
    fn failure_reports_without_reload() {
        let mut c = coordinator(10);
        let t0 = Instant::now();
        c.on_change("app/scss/style.scss", t0);
        c.poll(ms(t0, 10));

        let cmds = c.on_finished(0, RunOutcome::Failed("syntax error".into()), ms(t0, 20));
        assert_eq!(
            cmds,
            vec![CoordinatorCommand::ReportFailure {
                task: "css".into(),
                message: "syntax error".into()
            }]
        );
        assert_eq!(c.slot_state(0), Some(SlotState::Watching));
    }

    #[test]
    fn unchanged_run_does_not_reload() {
        let mut c = coordinator(10);
        let t0 = Instant::now();
        c.on_change("app/scss/style.scss", t0);
        c.poll(ms(t0, 10));
        assert!(c.on_finished(0, RunOutcome::Unchanged, ms(t0, 20)).is_empty());
    }

    #[test]
    fn silent_binding_succeeds_without_reload() {
        let binding = WatchBinding::new("fonts", vec!["app/fonts/**".into()]).notify_on_complete(false);
        let mut c = Coordinator::new(
            vec![CompiledBinding::compile(binding).unwrap()],
            Duration::from_millis(10),
        );
        c.start();
        let t0 = Instant::now();
        c.on_change("app/fonts/a.ttf", t0);
        assert_eq!(c.poll(ms(t0, 10)).len(), 1);

        assert!(c.on_finished(0, RunOutcome::Succeeded, ms(t0, 20)).is_empty());
        assert_eq!(c.slot_state(0), Some(SlotState::Watching));
    }

    #[test]
    fn stray_finish_is_ignored() {
        let mut c = coordinator(10);
        assert!(c.on_finished(0, RunOutcome::Succeeded, Instant::now()).is_empty());
        assert!(c.on_finished(7, RunOutcome::Succeeded, Instant::now()).is_empty());
    }
}
