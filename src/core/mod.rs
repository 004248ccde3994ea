//! Core engine - task graph, resource pool, feasibility scheduling

mod graph;
mod pool;
mod scheduler;

pub use graph::{DependencyGraph, ProjectId, Task, TaskId, TaskStatus};
pub use pool::{Borrower, BorrowerId, BorrowerStatus, ResourcePool};
pub use scheduler::{Feasibility, FeasibilityScheduler, InfeasibleReason, Schedule, SimulatedRun};
