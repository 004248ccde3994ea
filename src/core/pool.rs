//! Resource pool - the shared, fungible capacity tasks compete for
//!
//! Feasibility analysis only ever reads [`ResourcePool::total_capacity`].
//! The borrower path (`acquire` / `release`) is the live allocation mode:
//! the pool is the single owner of the committed counter, admits waiting
//! borrowers first-come-first-served, and accepts one release per grant.

use super::graph::{ProjectId, TaskId};
use crate::error::PoolError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identity of a borrower in the live pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowerId {
    Task { project: ProjectId, task: TaskId },
    Reservation(u32),
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task { project, task } => write!(f, "task {} of project {}", task, project),
            Self::Reservation(id) => write!(f, "reservation {}", id),
        }
    }
}

/// Anything that can request and hold units from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Borrower {
    /// A project task executed against the live pool
    Task {
        project: ProjectId,
        task: TaskId,
        resource: u64,
    },
    /// A standing hold not tied to any task (maintenance windows, headroom)
    Reservation { id: u32, resource: u64 },
}

impl Borrower {
    pub fn id(&self) -> BorrowerId {
        match *self {
            Self::Task { project, task, .. } => BorrowerId::Task { project, task },
            Self::Reservation { id, .. } => BorrowerId::Reservation(id),
        }
    }

    pub fn requirement(&self) -> u64 {
        match *self {
            Self::Task { resource, .. } | Self::Reservation { resource, .. } => resource,
        }
    }
}

/// Allocation status of a borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowerStatus {
    Idle,
    /// Queued until enough units are released
    Waitlisted,
    Allocated,
    Deallocated,
    /// Requirement exceeds the pool's total capacity
    InsufficientResource,
}

#[derive(Debug, Default)]
struct PoolState {
    committed: u64,
    waiting: VecDeque<Borrower>,
    allocated: HashMap<BorrowerId, u64>,
    /// Last outcome of borrowers that hold nothing: `Deallocated` or
    /// `InsufficientResource`, one entry per borrower
    settled: HashMap<BorrowerId, BorrowerStatus>,
}

/// Shared resource pool with a fixed total capacity
#[derive(Debug)]
pub struct ResourcePool {
    capacity: u64,
    state: Mutex<PoolState>,
}

impl ResourcePool {
    /// Create a pool; capacity is fixed for the pool's lifetime
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn total_capacity(&self) -> u64 {
        self.capacity
    }

    /// False when `requirement` can never be satisfied, however idle the pool is
    pub fn sufficient_for(&self, requirement: u64) -> bool {
        requirement <= self.capacity
    }

    /// Units currently held by live borrowers
    pub fn committed(&self) -> u64 {
        self.state().committed
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.state().committed
    }

    /// Borrowers waiting for units, in arrival order
    pub fn waiting(&self) -> Vec<BorrowerId> {
        self.state().waiting.iter().map(Borrower::id).collect()
    }

    pub fn status(&self, id: BorrowerId) -> BorrowerStatus {
        let state = self.state();
        if state.allocated.contains_key(&id) {
            BorrowerStatus::Allocated
        } else if state.waiting.iter().any(|b| b.id() == id) {
            BorrowerStatus::Waitlisted
        } else {
            state
                .settled
                .get(&id)
                .copied()
                .unwrap_or(BorrowerStatus::Idle)
        }
    }

    /// Request units for a borrower
    ///
    /// Grants immediately when nobody is queued ahead and enough units are
    /// free; otherwise the borrower joins the back of the wait-list.
    pub fn acquire(&self, borrower: Borrower) -> Result<BorrowerStatus, PoolError> {
        let id = borrower.id();
        let requested = borrower.requirement();

        if !self.sufficient_for(requested) {
            log::warn!(
                "Rejecting {}: needs {} of {} units",
                id,
                requested,
                self.capacity
            );
            let mut state = self.state();
            if !state.allocated.contains_key(&id) && !state.waiting.iter().any(|b| b.id() == id) {
                state.settled.insert(id, BorrowerStatus::InsufficientResource);
            }
            return Err(PoolError::InsufficientResource {
                borrower: id,
                requested,
                capacity: self.capacity,
            });
        }

        let mut state = self.state();
        if state.allocated.contains_key(&id) || state.waiting.iter().any(|b| b.id() == id) {
            return Err(PoolError::AlreadyHeld(id));
        }
        state.settled.remove(&id);

        if state.waiting.is_empty() && state.committed + requested <= self.capacity {
            state.committed += requested;
            state.allocated.insert(id, requested);
            log::debug!("Allocated {} units to {}", requested, id);
            Ok(BorrowerStatus::Allocated)
        } else {
            state.waiting.push_back(borrower);
            log::debug!("Wait-listed {} ({} queued)", id, state.waiting.len());
            Ok(BorrowerStatus::Waitlisted)
        }
    }

    /// Return a borrower's units and admit waiting borrowers in order
    ///
    /// Returns the ids granted as a result of this release. Admission stops
    /// at the first queued borrower that does not fit.
    pub fn release(&self, id: BorrowerId) -> Result<Vec<BorrowerId>, PoolError> {
        let mut state = self.state();
        let held = state
            .allocated
            .remove(&id)
            .ok_or(PoolError::UnknownBorrower(id))?;
        state.committed -= held;
        state.settled.insert(id, BorrowerStatus::Deallocated);
        log::debug!("Released {} units from {}", held, id);

        let mut granted = Vec::new();
        while let Some(next) = state.waiting.front().copied() {
            if state.committed + next.requirement() > self.capacity {
                break;
            }
            state.waiting.pop_front();
            state.committed += next.requirement();
            state.allocated.insert(next.id(), next.requirement());
            log::debug!("Allocated {} units to {}", next.requirement(), next.id());
            granted.push(next.id());
        }

        Ok(granted)
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(task: TaskId, resource: u64) -> Borrower {
        Borrower::Task {
            project: 1,
            task,
            resource,
        }
    }

    fn id(task: TaskId) -> BorrowerId {
        BorrowerId::Task { project: 1, task }
    }

    #[test]
    fn test_sufficient_for_is_a_hard_limit() {
        let pool = ResourcePool::new(1000);
        assert_eq!(pool.total_capacity(), 1000);
        assert!(pool.sufficient_for(1000));
        assert!(!pool.sufficient_for(1001));
    }

    #[test]
    fn test_acquire_and_release() {
        let pool = ResourcePool::new(1000);
        assert_eq!(pool.acquire(task(1, 600)).unwrap(), BorrowerStatus::Allocated);
        assert_eq!(pool.committed(), 600);
        assert_eq!(pool.available(), 400);

        assert!(pool.release(id(1)).unwrap().is_empty());
        assert_eq!(pool.committed(), 0);
        assert_eq!(pool.status(id(1)), BorrowerStatus::Deallocated);
    }

    #[test]
    fn test_waitlist_is_first_come_first_served() {
        let pool = ResourcePool::new(1000);
        pool.acquire(task(1, 900)).unwrap();
        assert_eq!(pool.acquire(task(2, 500)).unwrap(), BorrowerStatus::Waitlisted);
        // Fits right now, but must not overtake task 2
        assert_eq!(pool.acquire(task(3, 100)).unwrap(), BorrowerStatus::Waitlisted);
        assert_eq!(pool.waiting(), vec![id(2), id(3)]);

        let granted = pool.release(id(1)).unwrap();
        assert_eq!(granted, vec![id(2), id(3)]);
        assert_eq!(pool.committed(), 600);
        assert_eq!(pool.status(id(3)), BorrowerStatus::Allocated);
    }

    #[test]
    fn test_release_is_at_most_once() {
        let pool = ResourcePool::new(10);
        pool.acquire(task(1, 5)).unwrap();
        pool.release(id(1)).unwrap();
        assert_eq!(
            pool.release(id(1)).unwrap_err(),
            PoolError::UnknownBorrower(id(1))
        );
        assert_eq!(pool.committed(), 0);
    }

    #[test]
    fn test_over_capacity_request_is_rejected() {
        let pool = ResourcePool::new(1000);
        let err = pool.acquire(task(1, 1200)).unwrap_err();
        assert!(matches!(err, PoolError::InsufficientResource { requested: 1200, .. }));
        assert_eq!(pool.status(id(1)), BorrowerStatus::InsufficientResource);
    }

    #[test]
    fn test_status_reflects_latest_request() {
        let pool = ResourcePool::new(10);
        pool.acquire(task(1, 5)).unwrap();
        pool.release(id(1)).unwrap();
        assert_eq!(pool.status(id(1)), BorrowerStatus::Deallocated);

        assert!(pool.acquire(task(1, 50)).is_err());
        assert_eq!(pool.status(id(1)), BorrowerStatus::InsufficientResource);

        assert_eq!(pool.acquire(task(1, 5)).unwrap(), BorrowerStatus::Allocated);
        assert_eq!(pool.status(id(1)), BorrowerStatus::Allocated);
        pool.release(id(1)).unwrap();
        assert_eq!(pool.status(id(1)), BorrowerStatus::Deallocated);
    }

    #[test]
    fn test_settled_entries_do_not_accumulate() {
        let pool = ResourcePool::new(10);
        for _ in 0..3 {
            pool.acquire(task(1, 5)).unwrap();
            assert_eq!(pool.state().settled.len(), 0);
            pool.release(id(1)).unwrap();
            let _ = pool.acquire(task(1, 50));
        }
        assert_eq!(pool.state().settled.len(), 1);
    }

    #[test]
    fn test_double_acquire_is_rejected() {
        let pool = ResourcePool::new(10);
        pool.acquire(Borrower::Reservation { id: 9, resource: 4 })
            .unwrap();
        assert_eq!(
            pool.acquire(Borrower::Reservation { id: 9, resource: 4 })
                .unwrap_err(),
            PoolError::AlreadyHeld(BorrowerId::Reservation(9))
        );
    }
}
