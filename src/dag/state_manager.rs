// src/dag/state_manager.rs

//! State transitions of the slots taking part in one run.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::dag::task_info::{ScheduledTask, TaskRunState, TaskSlot};
use crate::types::TaskName;

/// Whether every dependency of `slot` is satisfied. Unknown dependencies
/// never are.
pub fn deps_satisfied(slots: &BTreeMap<TaskName, TaskSlot>, slot: &TaskSlot) -> bool {
    slot.deps
        .iter()
        .all(|dep| slots.get(dep).is_some_and(TaskSlot::satisfies_dependents))
}

/// Mutable view over the slots for the active run `run_id`.
pub struct RunLedger<'a> {
    graph: &'a TaskGraph,
    slots: &'a mut BTreeMap<TaskName, TaskSlot>,
    run_id: u64,
}

impl<'a> RunLedger<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        slots: &'a mut BTreeMap<TaskName, TaskSlot>,
        run_id: u64,
    ) -> Self {
        Self {
            graph,
            slots,
            run_id,
        }
    }

    /// Pull `root` and everything downstream of it into the run. Slots
    /// already in the run keep their state.
    pub fn enlist(&mut self, root: &str) {
        let mut stack = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            let Some(slot) = self.slots.get_mut(&name) else {
                continue;
            };
            if slot.state != TaskRunState::NotInRun {
                continue;
            }
            slot.state = TaskRunState::Pending;
            debug!(task = %name, run_id = self.run_id, "enlisted");
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
        }
    }

    /// Mark the pending downstream of `failed` as skipped and return their
    /// names, sorted.
    pub fn skip_downstream_of(&mut self, failed: &str) -> Vec<TaskName> {
        let mut stack = self.graph.dependents_of(failed).to_vec();
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(slot) = self.slots.get_mut(&name) else {
                continue;
            };
            if slot.state != TaskRunState::Pending {
                continue;
            }
            slot.state = TaskRunState::Skipped;
            debug!(task = %name, blocked_by = %failed, "skipped");
            skipped.push(name.clone());
            stack.extend(self.graph.dependents_of(&name).iter().cloned());
        }

        skipped.sort();
        skipped
    }

    /// Move every pending slot whose dependencies are satisfied to
    /// `Running` and hand it out for dispatch, in name order.
    pub fn dispatch_ready(&mut self) -> Vec<ScheduledTask> {
        let slots = &*self.slots;
        let ready: Vec<TaskName> = slots
            .values()
            .filter(|slot| slot.state == TaskRunState::Pending && deps_satisfied(slots, slot))
            .map(|slot| slot.name.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|name| {
                let slot = self.slots.get_mut(&name)?;
                slot.state = TaskRunState::Running;
                info!(task = %name, run_id = self.run_id, "dispatching");
                Some(ScheduledTask {
                    name,
                    run_id: self.run_id,
                })
            })
            .collect()
    }

    /// Nothing in the run is pending or running any more.
    pub fn is_settled(&self) -> bool {
        self.slots.values().all(|slot| !slot.state.is_active())
    }
}
