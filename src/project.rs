//! Project - an owned task set and its feasibility queries

use crate::core::{DependencyGraph, Feasibility, FeasibilityScheduler, ProjectId, Task, TaskId};
use crate::deadline::meets_deadline;
use crate::error::ProjectError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A set of tasks competing for one resource pool
///
/// Insertion order is kept; it only decides which of several
/// simultaneously-ready tasks the scheduler looks at first.
#[derive(Debug, Clone)]
pub struct Project {
    id: ProjectId,
    name: String,
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a task; a repeated task id is rejected, never overwritten
    pub fn add_task(&mut self, task: Task) -> Result<&mut Self, ProjectError> {
        if self.index.contains_key(&task.id) {
            log::warn!(
                "Project {} already has task {}, rejecting duplicate",
                self.name,
                task.id
            );
            return Err(ProjectError::DuplicateTaskId(task.id));
        }
        self.index.insert(task.id, self.tasks.len());
        self.tasks.push(task);
        Ok(self)
    }

    /// Get task by ID
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.index.get(&task_id).map(|&i| &self.tasks[i])
    }

    /// All tasks, in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Derive the dependency graph, rejecting dangling references
    pub fn graph(&self) -> Result<DependencyGraph, ProjectError> {
        Ok(DependencyGraph::build(&self.tasks)?)
    }

    /// Simulate the project against a pool of `capacity` units
    pub fn schedule(&self, capacity: u64) -> Result<Feasibility, ProjectError> {
        let verdict = FeasibilityScheduler::new(&self.tasks, capacity)?.run();
        log::debug!(
            "Project {} ({} tasks, capacity {}): {:?}",
            self.name,
            self.tasks.len(),
            capacity,
            verdict.makespan()
        );
        Ok(verdict)
    }

    /// Simulated completion time, `None` if the project can never finish
    pub fn makespan(&self, capacity: u64) -> Result<Option<u64>, ProjectError> {
        Ok(self.schedule(capacity)?.makespan())
    }

    /// Whether the project, started at `now`, finishes by `deadline`
    pub fn is_executable_by(
        &self,
        capacity: u64,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Result<bool, ProjectError> {
        Ok(self
            .makespan(capacity)?
            .is_some_and(|makespan| meets_deadline(now, makespan, deadline)))
    }

    /// Whether the project, started now, finishes by `deadline`
    pub fn is_executable_in_time(
        &self,
        capacity: u64,
        deadline: DateTime<Utc>,
    ) -> Result<bool, ProjectError> {
        self.is_executable_by(capacity, Utc::now(), deadline)
    }
}
