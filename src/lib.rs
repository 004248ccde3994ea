//! Makespan - resource-constrained project feasibility
//!
//! Models a project as a dependency graph of tasks competing for a shared,
//! finite resource pool, and answers whether it can finish by a deadline.

pub mod config;
pub mod core;
pub mod deadline;
pub mod error;
pub mod project;
pub mod workspace;

// Re-exports
pub use config::Config;
pub use crate::core::{
    Borrower, BorrowerId, BorrowerStatus, DependencyGraph, Feasibility, FeasibilityScheduler,
    InfeasibleReason, ProjectId, ResourcePool, Schedule, SimulatedRun, Task, TaskId, TaskStatus,
};
pub use deadline::{parse_deadline, CalendarDeadline};
pub use error::{DeadlineError, GraphError, PoolError, ProjectError};
pub use project::Project;
pub use workspace::Workspace;

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
