//! MILP engine abstraction.
//!
//! The rolling driver only sees [`MilpEngine`]: hand it a [`WindowModel`]
//! and a [`SolveBudget`], get back a [`SolveOutcome`]. Engines never panic
//! or return `Err` across this seam; every failure is a status.

mod good_lp_engine;

pub use good_lp_engine::{GoodLpEngine, MilpBackend};

use crate::formulation::{VarId, WindowModel};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// Integer-feasible but not proven optimal
    Feasible,
    Infeasible,
    Unbounded,
    Timeout,
    Error,
}

impl SolveStatus {
    /// Whether the outcome carries an assignment the driver may commit.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Timeout => "timeout",
            SolveStatus::Error => "error",
        })
    }
}

/// Variable values indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// `None` when the assignment has no entry for `var`.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveBudget {
    /// Wall-clock limit per window; `None` waits indefinitely.
    pub time_limit: Option<Duration>,
}

impl SolveBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            time_limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub assignment: Option<Assignment>,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl SolveOutcome {
    pub fn optimal(objective: f64, assignment: Assignment, elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective: Some(objective),
            assignment: Some(assignment),
            message: None,
            elapsed,
        }
    }

    pub fn failed(status: SolveStatus, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status,
            objective: None,
            assignment: None,
            message: Some(message.into()),
            elapsed,
        }
    }
}

/// A MILP engine usable by the rolling driver.
pub trait MilpEngine: Send + Sync {
    /// Identifier used in logs and the CLI (e.g. "microlp", "highs")
    fn name(&self) -> &str;

    fn solve(&self, model: &WindowModel, budget: &SolveBudget) -> SolveOutcome;
}

/// Run `work` on a dedicated thread and wait for it within `budget`.
///
/// On timeout the worker is left to finish on its own; its result is
/// discarded. A worker that panics is reported as [`SolveStatus::Error`].
pub fn run_with_budget<F>(work: F, budget: &SolveBudget) -> SolveOutcome
where
    F: FnOnce() -> SolveOutcome + Send + 'static,
{
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("milp-worker".into())
        .spawn(move || {
            let _ = tx.send(work());
        });
    if let Err(err) = spawned {
        return SolveOutcome::failed(
            SolveStatus::Error,
            format!("failed to start solver thread: {err}"),
            started.elapsed(),
        );
    }

    let received = match budget.time_limit {
        Some(limit) => rx.recv_timeout(limit),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => SolveOutcome::failed(
            SolveStatus::Timeout,
            format!(
                "no solution within {:.1}s",
                budget.time_limit.unwrap_or_default().as_secs_f64()
            ),
            started.elapsed(),
        ),
        Err(RecvTimeoutError::Disconnected) => SolveOutcome::failed(
            SolveStatus::Error,
            "solver worker exited without a result",
            started.elapsed(),
        ),
    }
}
