//! Feasibility Scheduler - resource-constrained list scheduling over the task DAG
//!
//! Simulates running a project against a pool of `capacity` units and
//! reports the makespan, or why the project can never finish. The run is a
//! greedy, deterministic estimate: ready tasks are taken in discovery order
//! and running tasks are retired earliest-finish first.

use super::graph::{DependencyGraph, Task, TaskId, TaskStatus};
use crate::error::GraphError;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// One task's simulated occupancy of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulatedRun {
    pub task: TaskId,
    pub start: u64,
    pub finish: u64,
    pub resource: u64,
}

/// Outcome of a successful simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Instant, relative to a start of 0, at which the last task finishes
    pub makespan: u64,
    /// Runs in admission order
    pub runs: Vec<SimulatedRun>,
}

impl Schedule {
    pub fn run_of(&self, task: TaskId) -> Option<&SimulatedRun> {
        self.runs.iter().find(|run| run.task == task)
    }
}

/// Why a project can never complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum InfeasibleReason {
    /// A single task needs more than the whole pool
    ExceedsCapacity {
        task: TaskId,
        requirement: u64,
        capacity: u64,
    },
    /// Tasks on, or downstream of, a dependency cycle were never admitted
    Unresolvable { unscheduled: Vec<TaskId> },
}

/// Verdict of one feasibility run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "kebab-case")]
pub enum Feasibility {
    Feasible(Schedule),
    Infeasible(InfeasibleReason),
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible(_))
    }

    pub fn makespan(&self) -> Option<u64> {
        match self {
            Self::Feasible(schedule) => Some(schedule.makespan),
            Self::Infeasible(_) => None,
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            Self::Feasible(schedule) => Some(schedule),
            Self::Infeasible(_) => None,
        }
    }

    /// Status a task reached by the end of the simulation
    ///
    /// Tasks the simulation never admitted read as `Idle`.
    pub fn status_of(&self, task: TaskId) -> TaskStatus {
        match self {
            Self::Feasible(schedule) if schedule.run_of(task).is_some() => TaskStatus::Finished,
            Self::Feasible(_) => TaskStatus::Idle,
            Self::Infeasible(InfeasibleReason::ExceedsCapacity { task: invalid, .. })
                if *invalid == task =>
            {
                TaskStatus::Invalid
            }
            Self::Infeasible(InfeasibleReason::ExceedsCapacity { .. }) => TaskStatus::Idle,
            Self::Infeasible(InfeasibleReason::Unresolvable { unscheduled }) => {
                if unscheduled.contains(&task) {
                    TaskStatus::Idle
                } else {
                    TaskStatus::Finished
                }
            }
        }
    }
}

/// Entry of the running set, ordered by finish time then admission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunningTask {
    finish: u64,
    admitted: usize,
    task: TaskId,
    resource: u64,
}

impl Ord for RunningTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.finish
            .cmp(&other.finish)
            .then(self.admitted.cmp(&other.admitted))
    }
}

impl PartialOrd for RunningTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Feasibility scheduler over one task set
///
/// Inputs are read-only; every [`run`](Self::run) builds its own
/// simulation state, so runs are independent and repeatable.
pub struct FeasibilityScheduler<'a> {
    graph: DependencyGraph,
    tasks: HashMap<TaskId, &'a Task>,
    capacity: u64,
}

impl<'a> FeasibilityScheduler<'a> {
    /// Derive the dependency graph of `tasks`, rejecting dangling references
    pub fn new(tasks: &'a [Task], capacity: u64) -> Result<Self, GraphError> {
        Ok(Self {
            graph: DependencyGraph::build(tasks)?,
            tasks: tasks.iter().map(|task| (task.id, task)).collect(),
            capacity,
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Simulate the project and return the verdict
    pub fn run(&self) -> Feasibility {
        for &id in self.graph.task_ids() {
            let task = self.tasks[&id];
            if task.resource > self.capacity {
                log::info!(
                    "Task {} needs {} units, pool holds {}: infeasible",
                    id,
                    task.resource,
                    self.capacity
                );
                return Feasibility::Infeasible(InfeasibleReason::ExceedsCapacity {
                    task: id,
                    requirement: task.resource,
                    capacity: self.capacity,
                });
            }
        }

        let mut sim = Simulation::new(self);

        loop {
            if let Some((id, earliest_start)) = sim.ready.pop_front() {
                let task = self.tasks[&id];
                let mut start = earliest_start;
                while task.resource > sim.available {
                    // Resource only runs short while something is running
                    match sim.evict() {
                        Some(freed_at) => start = freed_at,
                        None => break,
                    }
                }
                sim.admit(task, start);
            } else if !sim.running.is_empty() {
                while sim.ready.is_empty() && sim.evict().is_some() {}
            } else {
                break;
            }
        }

        if sim.unfinished != 0 {
            let unscheduled: Vec<TaskId> = self
                .graph
                .task_ids()
                .iter()
                .copied()
                .filter(|id| sim.status[id] == TaskStatus::Idle)
                .collect();
            log::info!(
                "{} task(s) never became ready (dependency cycle): {:?}",
                unscheduled.len(),
                unscheduled
            );
            return Feasibility::Infeasible(InfeasibleReason::Unresolvable { unscheduled });
        }

        while sim.evict().is_some() {}

        log::debug!("Simulation finished, makespan {}", sim.makespan);
        Feasibility::Feasible(Schedule {
            makespan: sim.makespan,
            runs: sim.runs,
        })
    }
}

/// Working state of a single simulation
struct Simulation<'s, 'a> {
    scheduler: &'s FeasibilityScheduler<'a>,
    in_degree: HashMap<TaskId, usize>,
    status: HashMap<TaskId, TaskStatus>,
    ready: VecDeque<(TaskId, u64)>,
    running: BinaryHeap<Reverse<RunningTask>>,
    available: u64,
    unfinished: usize,
    makespan: u64,
    runs: Vec<SimulatedRun>,
}

impl<'s, 'a> Simulation<'s, 'a> {
    fn new(scheduler: &'s FeasibilityScheduler<'a>) -> Self {
        let graph = &scheduler.graph;
        Self {
            scheduler,
            in_degree: graph.in_degrees(),
            status: graph
                .task_ids()
                .iter()
                .map(|&id| (id, TaskStatus::Idle))
                .collect(),
            ready: graph.roots().into_iter().map(|id| (id, 0)).collect(),
            running: BinaryHeap::new(),
            available: scheduler.capacity,
            unfinished: graph.len(),
            makespan: 0,
            runs: Vec::with_capacity(graph.len()),
        }
    }

    fn admit(&mut self, task: &Task, start: u64) {
        let finish = start.saturating_add(task.duration);
        log::debug!(
            "Admit task {} at {} (needs {}, {} free), finishes at {}",
            task.id,
            start,
            task.resource,
            self.available,
            finish
        );

        self.available -= task.resource;
        self.unfinished -= 1;
        self.status.insert(task.id, TaskStatus::Running);
        self.running.push(Reverse(RunningTask {
            finish,
            admitted: self.runs.len(),
            task: task.id,
            resource: task.resource,
        }));
        self.runs.push(SimulatedRun {
            task: task.id,
            start,
            finish,
            resource: task.resource,
        });
    }

    /// Retire the earliest-finishing running task and resolve its dependents
    ///
    /// Returns the retired task's finish time, or `None` if nothing runs.
    fn evict(&mut self) -> Option<u64> {
        let Reverse(done) = self.running.pop()?;
        self.available += done.resource;
        self.makespan = self.makespan.max(done.finish);
        self.status.insert(done.task, TaskStatus::Finished);
        log::debug!("Evict task {} at {}", done.task, done.finish);

        for &dependent in self.scheduler.graph.dependents(done.task) {
            if let Some(remaining) = self.in_degree.get_mut(&dependent) {
                *remaining -= 1;
                if *remaining == 0 {
                    self.ready.push_back((dependent, done.finish));
                }
            }
        }

        Some(done.finish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate(tasks: &[Task], capacity: u64) -> Feasibility {
        FeasibilityScheduler::new(tasks, capacity).unwrap().run()
    }

    #[test]
    fn test_waits_for_resource_before_admission() {
        let tasks = vec![
            Task::new(1, 500, 500),
            Task::new(2, 500, 500),
            Task::new(3, 800, 700),
        ];
        let result = simulate(&tasks, 1000);
        let schedule = result.schedule().unwrap();

        assert_eq!(schedule.makespan, 1300);
        assert_eq!(schedule.run_of(1).unwrap().finish, 500);
        assert_eq!(schedule.run_of(2).unwrap().finish, 500);
        assert_eq!(schedule.run_of(3).unwrap().start, 500);
    }

    #[test]
    fn test_chain_is_serialized_regardless_of_slack() {
        let tasks = vec![
            Task::new(3, 100, 1).depends_on([2]),
            Task::new(2, 100, 1).depends_on([1]),
            Task::new(1, 100, 1),
        ];
        assert_eq!(simulate(&tasks, 1000).makespan(), Some(300));
    }

    #[test]
    fn test_task_larger_than_pool_is_infeasible() {
        let tasks = vec![Task::new(1, 10, 1200)];
        assert_eq!(
            simulate(&tasks, 1000),
            Feasibility::Infeasible(InfeasibleReason::ExceedsCapacity {
                task: 1,
                requirement: 1200,
                capacity: 1000,
            })
        );
    }

    #[test]
    fn test_over_capacity_task_short_circuits_cycle_check() {
        let tasks = vec![
            Task::new(1, 10, 1).depends_on([2]),
            Task::new(2, 10, 1).depends_on([1]),
            Task::new(3, 10, 5000),
        ];
        assert!(matches!(
            simulate(&tasks, 1000),
            Feasibility::Infeasible(InfeasibleReason::ExceedsCapacity { task: 3, .. })
        ));
    }

    #[test]
    fn test_two_task_cycle_is_infeasible() {
        let tasks = vec![
            Task::new(1, 10, 1).depends_on([2]),
            Task::new(2, 10, 1).depends_on([1]),
        ];
        assert_eq!(
            simulate(&tasks, 1000),
            Feasibility::Infeasible(InfeasibleReason::Unresolvable {
                unscheduled: vec![1, 2]
            })
        );
    }

    #[test]
    fn test_cycle_blocks_downstream_only() {
        let tasks = vec![
            Task::new(1, 10, 1),
            Task::new(2, 10, 1).depends_on([3]),
            Task::new(3, 10, 1).depends_on([2]),
            Task::new(4, 10, 1).depends_on([1, 3]),
        ];
        assert_eq!(
            simulate(&tasks, 10),
            Feasibility::Infeasible(InfeasibleReason::Unresolvable {
                unscheduled: vec![2, 3, 4]
            })
        );
    }

    #[test]
    fn test_final_task_statuses() {
        let over = simulate(&[Task::new(1, 1, 1), Task::new(2, 1, 99)], 10);
        assert_eq!(over.status_of(2), TaskStatus::Invalid);
        assert_eq!(over.status_of(1), TaskStatus::Idle);

        let cyclic = simulate(
            &[
                Task::new(1, 1, 1),
                Task::new(2, 1, 1).depends_on([2]),
            ],
            10,
        );
        assert_eq!(cyclic.status_of(1), TaskStatus::Finished);
        assert_eq!(cyclic.status_of(2), TaskStatus::Idle);

        let done = simulate(&[Task::new(1, 1, 1)], 10);
        assert_eq!(done.status_of(1), TaskStatus::Finished);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![Task::new(1, 10, 1).depends_on([1])];
        assert!(!simulate(&tasks, 10).is_feasible());
    }

    #[test]
    fn test_independent_tasks_run_concurrently() {
        let tasks = vec![
            Task::new(1, 30, 2),
            Task::new(2, 70, 3),
            Task::new(3, 50, 5),
        ];
        assert_eq!(simulate(&tasks, 10).makespan(), Some(70));
    }

    #[test]
    fn test_full_contention_serializes() {
        let tasks = vec![
            Task::new(1, 30, 10),
            Task::new(2, 70, 10),
            Task::new(3, 50, 10),
        ];
        let result = simulate(&tasks, 10);
        let schedule = result.schedule().unwrap();
        assert_eq!(schedule.makespan, 150);
        let order: Vec<TaskId> = schedule.runs.iter().map(|run| run.task).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_diamond_waits_for_slowest_branch() {
        let tasks = vec![
            Task::new(1, 10, 1),
            Task::new(2, 40, 1).depends_on([1]),
            Task::new(3, 20, 1).depends_on([1]),
            Task::new(4, 5, 1).depends_on([2, 3]),
        ];
        let result = simulate(&tasks, 10);
        let schedule = result.schedule().unwrap();
        assert_eq!(schedule.run_of(4).unwrap().start, 50);
        assert_eq!(schedule.makespan, 55);
    }

    #[test]
    fn test_waiting_task_starts_at_last_eviction() {
        let tasks = vec![
            Task::new(1, 100, 10),
            Task::new(2, 50, 5),
            Task::new(3, 1, 5),
            Task::new(4, 100, 5).depends_on([1]),
        ];
        let result = simulate(&tasks, 10);
        let schedule = result.schedule().unwrap();

        // Task 3 is admitted straight away at its earliest start
        assert_eq!(schedule.run_of(3).unwrap().start, 0);
        assert_eq!(schedule.run_of(3).unwrap().finish, 1);
        // Task 4 (ready at 100) waits for units and takes the evicted finish time
        let waited = schedule.run_of(4).unwrap();
        assert_eq!((waited.start, waited.finish), (1, 101));
        assert_eq!(schedule.makespan, 150);
    }

    #[test]
    fn test_dangling_reference_is_rejected_at_construction() {
        let tasks = vec![Task::new(1, 10, 1).depends_on([5])];
        assert!(matches!(
            FeasibilityScheduler::new(&tasks, 10),
            Err(GraphError::DanglingDependency { task: 1, missing: 5 })
        ));
    }

    #[test]
    fn test_empty_project_has_zero_makespan() {
        assert_eq!(simulate(&[], 10).makespan(), Some(0));
    }

    #[test]
    fn test_zero_duration_tasks() {
        let tasks = vec![
            Task::new(1, 0, 1),
            Task::new(2, 0, 1).depends_on([1]),
        ];
        assert_eq!(simulate(&tasks, 1).makespan(), Some(0));
    }

    #[test]
    fn test_runs_are_repeatable() {
        let tasks = vec![
            Task::new(1, 500, 500),
            Task::new(2, 500, 500),
            Task::new(3, 800, 700).depends_on([1]),
        ];
        let scheduler = FeasibilityScheduler::new(&tasks, 1000).unwrap();
        assert_eq!(scheduler.graph().len(), 3);
        assert_eq!(scheduler.run(), scheduler.run());
    }

    #[test]
    fn test_verdict_serializes_with_tag() {
        let json = serde_json::to_value(simulate(&[Task::new(1, 5, 1)], 1)).unwrap();
        assert_eq!(json["verdict"], "feasible");
        assert_eq!(json["detail"]["makespan"], 5);

        let json = serde_json::to_value(simulate(&[Task::new(1, 5, 2)], 1)).unwrap();
        assert_eq!(json["verdict"], "infeasible");
        assert_eq!(json["detail"]["reason"], "exceeds-capacity");
    }
}
