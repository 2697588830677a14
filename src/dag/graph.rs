// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{PipelineError, Result};
use crate::task::Task;
use crate::types::TaskName;

/// Synthetic node every build task depends on.
pub const CLEAN: &str = "clean";

/// Synthetic, isolated node standing for the preview server and watcher.
pub const SERVE: &str = "serve";

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one runs.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// Explicit task graph: build tasks plus the synthetic `clean` and `serve`
/// nodes. Edges mean "must complete before".
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl TaskGraph {
    /// Compose the graph for the given build tasks.
    ///
    /// - `clean` precedes every task.
    /// - each `after` entry adds an edge from that task.
    /// - `serve` has no edges.
    ///
    /// Unknown or reserved names are configuration errors; cycles are
    /// reported as [`PipelineError::DagCycle`].
    pub fn from_tasks(tasks: &[Task]) -> Result<Self> {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();
        nodes.insert(CLEAN.to_string(), DagNode::default());
        nodes.insert(SERVE.to_string(), DagNode::default());

        // First pass: create nodes with their dependency lists.
        for task in tasks {
            if task.name == CLEAN || task.name == SERVE {
                return Err(PipelineError::ConfigError(format!(
                    "task name '{}' is reserved",
                    task.name
                )));
            }

            let mut deps = vec![CLEAN.to_string()];
            for dep in &task.after {
                if !deps.contains(dep) {
                    deps.push(dep.clone());
                }
            }

            let node = DagNode {
                deps,
                dependents: Vec::new(),
            };
            if nodes.insert(task.name.clone(), node).is_some() {
                return Err(PipelineError::ConfigError(format!(
                    "task '{}' is defined twice",
                    task.name
                )));
            }
        }

        for task in tasks {
            for dep in &task.after {
                if dep == &task.name {
                    return Err(PipelineError::ConfigError(format!(
                        "task '{}' cannot depend on itself",
                        task.name
                    )));
                }
                if dep == SERVE || !nodes.contains_key(dep) {
                    return Err(PipelineError::ConfigError(format!(
                        "task '{}' depends on unknown task '{}'",
                        task.name, dep
                    )));
                }
            }
        }

        // Second pass: populate dependents based on deps.
        let task_names: Vec<TaskName> = nodes.keys().cloned().collect();
        for task_name in task_names {
            let deps = nodes
                .get(&task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_name.clone());
                }
            }
        }

        let graph = Self { nodes };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<()> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (name, node) in &self.nodes {
            graph.add_node(name.as_str());
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(PipelineError::DagCycle(format!(
                "cycle involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Return all node names, `clean` and `serve` included, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Build task names (neither `clean` nor `serve`), sorted.
    pub fn build_tasks(&self) -> impl Iterator<Item = &str> {
        self.tasks().filter(|n| *n != CLEAN && *n != SERVE)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Level plan excluding `serve`: each stage holds the tasks whose
    /// dependencies all sit in earlier stages, names sorted.
    pub fn stages(&self) -> Vec<Vec<TaskName>> {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .nodes
            .iter()
            .filter(|(name, _)| name.as_str() != SERVE)
            .map(|(name, node)| {
                (
                    name.as_str(),
                    node.deps.iter().map(String::as_str).collect(),
                )
            })
            .collect();

        let mut stages = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name)
                .collect();
            if ready.is_empty() {
                // Unreachable for graphs built through `from_tasks`.
                break;
            }
            for name in &ready {
                remaining.remove(name);
            }
            for deps in remaining.values_mut() {
                for name in &ready {
                    deps.remove(name);
                }
            }
            stages.push(ready.into_iter().map(str::to_string).collect());
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_precedes_everything_and_serve_is_isolated() {
        let graph =
            TaskGraph::from_tasks(&[Task::new("css"), Task::new("js"), Task::new("html")]).unwrap();

        assert_eq!(graph.dependencies_of("css"), &["clean".to_string()]);
        assert!(graph.dependencies_of(SERVE).is_empty());
        assert!(graph.dependents_of(SERVE).is_empty());
        assert_eq!(
            graph.stages(),
            vec![
                vec!["clean".to_string()],
                vec!["css".to_string(), "html".to_string(), "js".to_string()],
            ]
        );
    }

    #[test]
    fn after_edges_add_levels() {
        let graph = TaskGraph::from_tasks(&[
            Task::new("sprite"),
            Task::new("html").after("sprite"),
        ])
        .unwrap();
        assert_eq!(
            graph.stages(),
            vec![
                vec!["clean".to_string()],
                vec!["sprite".to_string()],
                vec!["html".to_string()],
            ]
        );
    }

    #[test]
    fn cycles_and_unknown_deps_are_rejected() {
        let cycle = TaskGraph::from_tasks(&[Task::new("a").after("b"), Task::new("b").after("a")]);
        assert!(matches!(cycle, Err(PipelineError::DagCycle(_))));

        let unknown = TaskGraph::from_tasks(&[Task::new("a").after("nope")]);
        assert!(matches!(unknown, Err(PipelineError::ConfigError(_))));

        let reserved = TaskGraph::from_tasks(&[Task::new("clean")]);
        assert!(matches!(reserved, Err(PipelineError::ConfigError(_))));
    }
}
