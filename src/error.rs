//! Typed errors for the feasibility library
//!
//! Structural infeasibility (cycles, over-capacity tasks) is not an error:
//! it is reported through [`crate::core::Feasibility`]. The variants here are
//! data-integrity faults that must fail loudly.

use crate::core::{BorrowerId, TaskId};
use thiserror::Error;

/// Faults found while deriving the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("task {task} depends on unknown task {missing}")]
    DanglingDependency { task: TaskId, missing: TaskId },

    #[error("task {0} appears more than once in the task set")]
    DuplicateTask(TaskId),
}

/// Faults raised while building or querying a project
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("project already contains a task with id {0}")]
    DuplicateTaskId(TaskId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Faults raised by the live borrower path of the resource pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("{borrower} requests {requested} units but the pool only holds {capacity}")]
    InsufficientResource {
        borrower: BorrowerId,
        requested: u64,
        capacity: u64,
    },

    #[error("{0} holds no allocation to release")]
    UnknownBorrower(BorrowerId),

    #[error("{0} already holds or awaits an allocation")]
    AlreadyHeld(BorrowerId),
}

/// Faults raised while turning user input into a deadline instant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeadlineError {
    #[error("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid calendar instant")]
    InvalidDate {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    },

    #[error("cannot parse deadline {0:?}")]
    Unparseable(String),
}
