//! Task graph - task definitions and the derived dependency DAG

use crate::error::GraphError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Task identifier, unique within a project
pub type TaskId = u32;

/// Project identifier, assigned by the workspace registry
pub type ProjectId = u32;

/// Task status enum — only meaningful inside one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Idle,
    Running,
    Finished,
    /// Requirement exceeds the pool's total capacity; the task can never run
    Invalid,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// A unit of work competing for the shared resource pool
///
/// `duration` is in seconds, `resource` in pool units. Prerequisites form an
/// ordered set: repeated ids are dropped, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub duration: u64,
    #[serde(alias = "requirement")]
    pub resource: u64,
    #[serde(default, deserialize_with = "ordered_set")]
    depends_on: Vec<TaskId>,
}

fn ordered_set<'de, D>(deserializer: D) -> Result<Vec<TaskId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<TaskId>::deserialize(deserializer)?;
    Ok(dedup_preserving_order(raw))
}

fn dedup_preserving_order(ids: impl IntoIterator<Item = TaskId>) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

impl Task {
    /// Create a task with no prerequisites
    pub fn new(id: TaskId, duration: u64, resource: u64) -> Self {
        Self {
            id,
            duration,
            resource,
            depends_on: Vec::new(),
        }
    }

    /// Add a single prerequisite (fluent)
    pub fn depends_on_task(mut self, prerequisite: TaskId) -> Self {
        if !self.depends_on.contains(&prerequisite) {
            self.depends_on.push(prerequisite);
        }
        self
    }

    /// Add several prerequisites (fluent)
    pub fn depends_on(self, prerequisites: impl IntoIterator<Item = TaskId>) -> Self {
        prerequisites
            .into_iter()
            .fold(self, |task, id| task.depends_on_task(id))
    }

    /// Prerequisite task ids in declaration order
    pub fn dependencies(&self) -> &[TaskId] {
        &self.depends_on
    }
}

/// Dependency DAG derived from a task set
///
/// Built fresh for every feasibility query; never persisted. Despite the
/// name, cycles are representable here: the scheduler is what detects them.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<TaskId>,
    in_degree: HashMap<TaskId, usize>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyGraph {
    /// Build the in-degree and dependents maps
    ///
    /// Fails on a prerequisite id that names no task in the set, and on a
    /// repeated task id.
    pub fn build(tasks: &[Task]) -> Result<Self, GraphError> {
        let mut in_degree = HashMap::with_capacity(tasks.len());
        let mut order = Vec::with_capacity(tasks.len());

        for task in tasks {
            if in_degree.insert(task.id, task.dependencies().len()).is_some() {
                return Err(GraphError::DuplicateTask(task.id));
            }
            order.push(task.id);
        }

        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for task in tasks {
            for &prerequisite in task.dependencies() {
                if !in_degree.contains_key(&prerequisite) {
                    log::warn!(
                        "Task {} references unknown prerequisite {}",
                        task.id,
                        prerequisite
                    );
                    return Err(GraphError::DanglingDependency {
                        task: task.id,
                        missing: prerequisite,
                    });
                }
                dependents.entry(prerequisite).or_default().push(task.id);
            }
        }

        Ok(Self {
            order,
            in_degree,
            dependents,
        })
    }

    /// Number of unresolved prerequisites of a task
    pub fn in_degree(&self, task_id: TaskId) -> Option<usize> {
        self.in_degree.get(&task_id).copied()
    }

    /// Tasks that list `task_id` as a prerequisite, in discovery order
    pub fn dependents(&self, task_id: TaskId) -> &[TaskId] {
        self.dependents
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tasks with no prerequisites, in task-set order
    pub fn roots(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.in_degree.get(id) == Some(&0))
            .collect()
    }

    /// All task ids in task-set order
    pub fn task_ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Working copy of the in-degree map for one simulation
    pub(crate) fn in_degrees(&self) -> HashMap<TaskId, usize> {
        self.in_degree.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
