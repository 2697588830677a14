// tests/scheduler_proptest.rs

use std::collections::{BTreeSet, HashSet, VecDeque};

use proptest::prelude::*;

use assetpipe::dag::{CLEAN, Scheduler, TaskGraph, TaskRunState};
use assetpipe::engine::TaskOutcome;
use assetpipe::errors::TaskError;
use assetpipe::task::{Task, TaskReport};

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Task>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let deps: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    deps.into_iter()
                        .fold(Task::new(format!("task_{i}")), |task, d| {
                            task.after(format!("task_{d}"))
                        })
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn build_terminates_and_respects_dependencies(
        tasks in dag_strategy(10),
        failing_indices in proptest::collection::vec(0..11usize, 0..4),
    ) {
        let graph = TaskGraph::from_tasks(&tasks).unwrap();
        let mut scheduler = Scheduler::from_graph(&graph);

        // Index 10 stands for clean.
        let failing: HashSet<String> = failing_indices
            .iter()
            .map(|&i| if i == 10 { CLEAN.to_string() } else { format!("task_{i}") })
            .collect();

        let mut queue: VecDeque<String> = scheduler
            .step_trigger(CLEAN)
            .newly_scheduled
            .into_iter()
            .map(|t| t.name)
            .collect();
        let mut succeeded: HashSet<String> = HashSet::new();
        let mut ran: HashSet<String> = HashSet::new();
        let mut steps = 0;

        while let Some(name) = queue.pop_front() {
            steps += 1;
            prop_assert!(steps < 1000, "simulation did not terminate");

            for dep in graph.dependencies_of(&name) {
                prop_assert!(succeeded.contains(dep), "{} ran before {}", name, dep);
            }
            prop_assert!(ran.insert(name.clone()), "{} ran twice", name);

            let outcome = if failing.contains(&name) {
                TaskOutcome::Failed(TaskError::Invalid {
                    task: name.clone(),
                    message: "scripted".to_string(),
                })
            } else {
                succeeded.insert(name.clone());
                TaskOutcome::Success(TaskReport::empty(name.clone()))
            };

            for next in scheduler.step_completion(&name, &outcome).newly_scheduled {
                queue.push_back(next.name);
            }
        }

        prop_assert!(scheduler.is_idle());

        for name in scheduler.task_names() {
            let all_deps_ok = graph
                .dependencies_of(name)
                .iter()
                .all(|d| succeeded.contains(d));
            let state = scheduler.run_state_of(name).unwrap();

            if ran.contains(name) {
                prop_assert!(all_deps_ok);
                let expected = if failing.contains(name) {
                    TaskRunState::DoneFailed
                } else {
                    TaskRunState::DoneSuccess
                };
                prop_assert_eq!(state, expected);
            } else {
                prop_assert!(!all_deps_ok, "{} never ran although its deps succeeded", name);
                prop_assert_eq!(state, TaskRunState::Skipped);
            }
        }
    }
}
