//! Workspace - project registry and the shared resource pool
//!
//! One workspace is built at process start and handed to whatever needs
//! project lookup or pool access.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::core::{Feasibility, ProjectId, ResourcePool};
use crate::error::ProjectError;
use crate::project::Project;

/// Registry of projects sharing one resource pool
#[derive(Debug)]
pub struct Workspace {
    pool: Arc<ResourcePool>,
    projects: BTreeMap<ProjectId, Project>,
    deadlines: BTreeMap<ProjectId, String>,
    next_id: ProjectId,
}

impl Workspace {
    /// Create an empty workspace around a fresh pool
    pub fn new(capacity: u64) -> Self {
        Self::with_pool(Arc::new(ResourcePool::new(capacity)))
    }

    /// Create an empty workspace around an existing pool
    pub fn with_pool(pool: Arc<ResourcePool>) -> Self {
        Self {
            pool,
            projects: BTreeMap::new(),
            deadlines: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Build a workspace from a loaded project file
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut workspace = Self::new(config.capacity);

        for project_config in &config.projects {
            let id = workspace.create_project(project_config.name.clone().unwrap_or_default());
            let project = workspace
                .projects
                .get_mut(&id)
                .context("project vanished right after creation")?;

            let name = project.name().to_string();
            for task in &project_config.tasks {
                project
                    .add_task(task.clone())
                    .with_context(|| format!("in project {}", name))?;
            }
            if let Some(deadline) = &project_config.deadline {
                workspace.deadlines.insert(id, deadline.clone());
            }
        }

        log::info!(
            "Loaded {} projects, {} tasks, capacity {}",
            workspace.project_count(),
            workspace.total_task_count(),
            workspace.capacity()
        );
        Ok(workspace)
    }

    /// Register a new, empty project and return its id
    ///
    /// An empty name becomes `project-<id>`.
    pub fn create_project(&mut self, name: impl Into<String>) -> ProjectId {
        let id = self.next_id;
        self.next_id += 1;

        let mut name = name.into();
        if name.is_empty() {
            name = format!("project-{}", id);
        }
        self.projects.insert(id, Project::new(id, name));
        id
    }

    /// Get project by ID
    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.projects.get_mut(&id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name() == name)
    }

    /// Deadline declared for a project in its project file
    pub fn declared_deadline(&self, id: ProjectId) -> Option<&str> {
        self.deadlines.get(&id).map(String::as_str)
    }

    /// All project ids in creation order
    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.keys().copied().collect()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Get total task count across all projects
    pub fn total_task_count(&self) -> usize {
        self.projects.values().map(|p| p.tasks().len()).sum()
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn capacity(&self) -> u64 {
        self.pool.total_capacity()
    }

    /// Simulate a project against the shared pool's capacity
    pub fn schedule_project(&self, id: ProjectId) -> Option<Result<Feasibility, ProjectError>> {
        self.project(id)
            .map(|project| project.schedule(self.capacity()))
    }

    /// Whether a project started at `now` finishes by `deadline`
    ///
    /// Unknown projects answer `Ok(false)`; dangling dependencies are errors.
    pub fn is_project_executable_by(
        &self,
        id: ProjectId,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Result<bool, ProjectError> {
        match self.project(id) {
            Some(project) => project.is_executable_by(self.capacity(), now, deadline),
            None => {
                log::warn!("Feasibility query for unknown project {}", id);
                Ok(false)
            }
        }
    }

    /// Whether a project started now finishes by `deadline`
    pub fn is_project_executable_in_time(
        &self,
        id: ProjectId,
        deadline: DateTime<Utc>,
    ) -> Result<bool, ProjectError> {
        self.is_project_executable_by(id, Utc::now(), deadline)
    }
}
