//! [`MilpEngine`] backed by `good_lp`.
//!
//! microlp (pure Rust) is always available; HiGHS is compiled in with the
//! `solver-highs` feature.

use super::{run_with_budget, Assignment, MilpEngine, SolveBudget, SolveOutcome, SolveStatus};
use crate::formulation::{Sense, VarId, VarKind, WindowModel};
use anyhow::anyhow;
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, variables, Constraint, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MilpBackend {
    #[default]
    Microlp,
    #[cfg(feature = "solver-highs")]
    Highs,
}

const AVAILABLE_BACKENDS: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl MilpBackend {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_BACKENDS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilpBackend::Microlp => "microlp",
            #[cfg(feature = "solver-highs")]
            MilpBackend::Highs => "highs",
        }
    }
}

impl fmt::Display for MilpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unknown_backend_error(label: &str) -> anyhow::Error {
    anyhow!(
        "unknown MILP backend '{}'; supported values: {}",
        label,
        MilpBackend::available().join(", ")
    )
}

impl FromStr for MilpBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" => Ok(MilpBackend::Microlp),
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(MilpBackend::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_backend_error(&normalized))
                }
            }
            other => Err(unknown_backend_error(other)),
        }
    }
}

/// Translates a [`WindowModel`] into a `good_lp` problem and solves it on a
/// worker thread bounded by the [`SolveBudget`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpEngine {
    backend: MilpBackend,
}

impl GoodLpEngine {
    pub fn new(backend: MilpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> MilpBackend {
        self.backend
    }
}

impl MilpEngine for GoodLpEngine {
    fn name(&self) -> &str {
        self.backend.as_str()
    }

    fn solve(&self, model: &WindowModel, budget: &SolveBudget) -> SolveOutcome {
        let model = model.clone();
        let backend = self.backend;
        run_with_budget(move || solve_blocking(&model, backend), budget)
    }
}

fn solve_blocking(model: &WindowModel, backend: MilpBackend) -> SolveOutcome {
    let started = Instant::now();

    // Rows without variables are decided here; some backends reject them.
    let unsatisfiable = model
        .constraints
        .iter()
        .find(|c| c.expr.terms.is_empty() && c.violation(&[]) > 1e-9);
    if let Some(row) = unsatisfiable {
        return SolveOutcome::failed(
            SolveStatus::Infeasible,
            format!(
                "{} cannot hold: {} {} {}",
                row.name, row.expr.constant, row.sense, row.rhs
            ),
            started.elapsed(),
        );
    }

    let mut vars = variables!();
    let handles: Vec<Variable> = model
        .variables
        .iter()
        .map(|spec| {
            let mut def = variable();
            if spec.kind == VarKind::Binary {
                def = def.binary();
            }
            if spec.lower.is_finite() {
                def = def.min(spec.lower);
            }
            if spec.upper.is_finite() {
                def = def.max(spec.upper);
            }
            vars.add(def)
        })
        .collect();

    let expression = |terms: &[(VarId, f64)]| {
        let mut expr = Expression::from(0.0);
        for &(var, coef) in terms {
            expr += coef * handles[var.index()];
        }
        expr
    };

    let objective = expression(&model.objective.terms);
    let constraints: Vec<Constraint> = model
        .constraints
        .iter()
        .filter(|c| !c.expr.terms.is_empty())
        .map(|c| {
            let lhs = expression(&c.expr.terms);
            let rhs = c.rhs - c.expr.constant;
            match c.sense {
                Sense::Le => constraint!(lhs <= rhs),
                Sense::Ge => constraint!(lhs >= rhs),
                Sense::Eq => constraint!(lhs == rhs),
            }
        })
        .collect();

    let unsolved = vars.minimise(objective);
    let solved = match backend {
        MilpBackend::Microlp => finish(unsolved.using(microlp), constraints, &handles),
        #[cfg(feature = "solver-highs")]
        MilpBackend::Highs => finish(unsolved.using(highs), constraints, &handles),
    };

    let elapsed = started.elapsed();
    match solved {
        Ok(values) => {
            let objective = model.objective.eval(&values);
            SolveOutcome::optimal(objective, Assignment::new(values), elapsed)
        }
        Err(ResolutionError::Infeasible) => {
            SolveOutcome::failed(SolveStatus::Infeasible, "problem is infeasible", elapsed)
        }
        Err(ResolutionError::Unbounded) => {
            SolveOutcome::failed(SolveStatus::Unbounded, "objective is unbounded", elapsed)
        }
        Err(err) => SolveOutcome::failed(SolveStatus::Error, err.to_string(), elapsed),
    }
}

fn finish<M>(
    mut problem: M,
    constraints: Vec<Constraint>,
    handles: &[Variable],
) -> Result<Vec<f64>, ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in constraints {
        problem.add_constraint(c);
    }
    let solution = problem.solve()?;
    Ok(handles.iter().map(|v| solution.value(*v)).collect())
}
