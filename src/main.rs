//! Makespan CLI entry point

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use makespan::config::CAPACITY_ENV;
use makespan::deadline::meets_deadline;
use makespan::{
    parse_deadline, Config, Feasibility, InfeasibleReason, Project, ProjectError, Workspace,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "makespan", version, about = "Can this project finish by its deadline?")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decide whether each project finishes by its deadline
    Check {
        #[command(flatten)]
        source: Source,
        /// Deadline (RFC 3339, YYYY-MM-DD[ HH:MM[:SS]], @epoch, +3600, +2h, +1d)
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the simulated timeline of each project
    Plan {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
    /// Report data-integrity faults without scheduling
    Validate {
        #[command(flatten)]
        source: Source,
    },
}

#[derive(Debug, Args)]
struct Source {
    /// Project file (defaults to makespan.yml or .makespan/projects.yml)
    file: Option<PathBuf>,
    /// Only this project
    #[arg(long)]
    project: Option<String>,
    /// Override the pool capacity
    #[arg(long)]
    capacity: Option<u64>,
}

impl Source {
    fn load(&self) -> Result<Workspace> {
        let mut config = match &self.file {
            Some(path) => {
                log::info!("Loading projects from: {}", path.display());
                Config::from_file(path)?
            }
            None => Config::auto_load()?,
        };
        config.apply_overrides(self.capacity, std::env::var(CAPACITY_ENV).ok().as_deref())?;
        Workspace::from_config(&config)
    }

    fn selected<'w>(&self, workspace: &'w Workspace) -> Result<Vec<&'w Project>> {
        match &self.project {
            Some(name) => {
                let project = workspace
                    .project_by_name(name)
                    .with_context(|| format!("No project named {:?}", name))?;
                Ok(vec![project])
            }
            None => Ok(workspace.projects().collect()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    project: &'a str,
    deadline: DateTime<Utc>,
    on_time: bool,
    #[serde(flatten)]
    feasibility: Feasibility,
}

fn main() -> Result<ExitCode> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check {
            source,
            deadline,
            json,
        } => check(&source, deadline.as_deref(), json),
        Command::Plan { source, json } => plan(&source, json),
        Command::Validate { source } => validate(&source),
    }
}

fn check(source: &Source, deadline: Option<&str>, json: bool) -> Result<ExitCode> {
    let workspace = source.load()?;
    let now = Utc::now();
    let mut reports = Vec::new();

    for project in source.selected(&workspace)? {
        let raw = deadline
            .or_else(|| workspace.declared_deadline(project.id()))
            .with_context(|| {
                format!(
                    "No deadline for project {}: pass --deadline or set one in the project file",
                    project.name()
                )
            })?;
        let deadline = parse_deadline(raw, now)?;
        let feasibility = project.schedule(workspace.capacity())?;
        let on_time = feasibility
            .makespan()
            .is_some_and(|span| meets_deadline(now, span, deadline));

        reports.push(CheckReport {
            project: project.name(),
            deadline,
            on_time,
            feasibility,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            match &report.feasibility {
                Feasibility::Feasible(schedule) => {
                    let finish = i64::try_from(schedule.makespan)
                        .ok()
                        .and_then(Duration::try_seconds)
                        .and_then(|span| now.checked_add_signed(span));
                    let finish = finish
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    let verdict = if report.on_time { "on time" } else { "late" };
                    println!(
                        "{}: {} (makespan {}s, finishes {}, deadline {})",
                        report.project,
                        verdict,
                        schedule.makespan,
                        finish,
                        report.deadline.to_rfc3339()
                    );
                }
                Feasibility::Infeasible(reason) => {
                    println!("{}: infeasible ({})", report.project, describe(reason));
                }
            }
        }
    }

    let all_on_time = reports.iter().all(|report| report.on_time);
    Ok(if all_on_time {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn plan(source: &Source, json: bool) -> Result<ExitCode> {
    let workspace = source.load()?;
    let mut plans = Vec::new();

    for project in source.selected(&workspace)? {
        plans.push((project.name(), project.schedule(workspace.capacity())?));
    }

    if json {
        let plans: Vec<_> = plans
            .iter()
            .map(|(name, feasibility)| serde_json::json!({ "project": name, "plan": feasibility }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(ExitCode::SUCCESS);
    }

    for (name, feasibility) in &plans {
        match feasibility {
            Feasibility::Feasible(schedule) => {
                println!("{} (capacity {}):", name, workspace.capacity());
                println!("  {:>6}  {:>10}  {:>10}  {:>8}", "task", "start", "finish", "units");
                for run in &schedule.runs {
                    println!(
                        "  {:>6}  {:>10}  {:>10}  {:>8}",
                        run.task, run.start, run.finish, run.resource
                    );
                }
                println!("  makespan: {}s", schedule.makespan);
            }
            Feasibility::Infeasible(reason) => {
                println!("{}: infeasible ({})", name, describe(reason));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn validate(source: &Source) -> Result<ExitCode> {
    let workspace = source.load()?;
    let mut faults = 0;

    for project in source.selected(&workspace)? {
        match project.graph() {
            Ok(graph) => println!("{}: ok ({} tasks)", project.name(), graph.len()),
            Err(ProjectError::Graph(err)) => {
                faults += 1;
                println!("{}: {}", project.name(), err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(if faults == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn describe(reason: &InfeasibleReason) -> String {
    match reason {
        InfeasibleReason::ExceedsCapacity {
            task,
            requirement,
            capacity,
        } => format!("task {} needs {} units, pool holds {}", task, requirement, capacity),
        InfeasibleReason::Unresolvable { unscheduled } => {
            let ids: Vec<String> = unscheduled.iter().map(|id| id.to_string()).collect();
            format!("dependency cycle blocks tasks {}", ids.join(", "))
        }
    }
}
