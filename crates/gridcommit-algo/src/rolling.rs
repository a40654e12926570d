//! Rolling-horizon driver.
//!
//! Day `d` solves window hours `d·commit + 1 ..= d·commit + H`, keeps the
//! first `commit` hours in the [`SimulationLog`] and hands the state at the
//! last committed hour to day `d + 1`. Days run strictly in order; a failed
//! day stops the run and returns everything committed before it.

use crate::formulation::{ModelBuilder, VarFamily, WindowModel};
use crate::solve::{Assignment, MilpEngine, SolveBudget, SolveOutcome, SolveStatus};
use crate::verify::verify_assignment;
use crate::window::HorizonWindow;
use gridcommit_core::{
    DaySummary, Grid, GridError, InitialState, NodeHour, NodeRole, RunParameters, SimulationLog,
    TimeSeries, UnitHour, UnitState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cooperative stop flag checked between days.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A run that stopped early, with every day committed before the failure.
#[derive(Debug, Error)]
#[error("run stopped after {days} committed day(s): {error}", days = .log.days_completed())]
pub struct RunFailure {
    #[source]
    pub error: GridError,
    pub log: SimulationLog,
}

type DayCallback<'a> = Box<dyn FnMut(&DaySummary) + 'a>;

pub struct RollingHorizon<'a> {
    grid: &'a Grid,
    params: &'a RunParameters,
    builder: ModelBuilder<'a>,
    engine: &'a dyn MilpEngine,
    budget: SolveBudget,
    cancel: Option<CancelToken>,
    verify_tolerance: Option<f64>,
    on_day: Option<DayCallback<'a>>,
}

impl<'a> RollingHorizon<'a> {
    pub fn new(
        grid: &'a Grid,
        series: &'a TimeSeries,
        params: &'a RunParameters,
        engine: &'a dyn MilpEngine,
    ) -> Self {
        Self {
            grid,
            params,
            builder: ModelBuilder::new(grid, series, params),
            engine,
            budget: SolveBudget::default(),
            cancel: None,
            verify_tolerance: None,
            on_day: None,
        }
    }

    pub fn with_budget(mut self, budget: SolveBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Re-check every accepted assignment against its model before committing.
    pub fn with_verification(mut self, tolerance: f64) -> Self {
        self.verify_tolerance = Some(tolerance);
        self
    }

    /// Called after each day is committed.
    pub fn on_day(mut self, callback: impl FnMut(&DaySummary) + 'a) -> Self {
        self.on_day = Some(Box::new(callback));
        self
    }

    pub fn run(mut self, initial: InitialState) -> Result<SimulationLog, RunFailure> {
        let mut log = SimulationLog::new();
        if let Err(error) = self.params.validate() {
            return Err(RunFailure { error, log });
        }

        tracing::info!(
            days = self.params.sim_days,
            horizon = self.params.horizon_hours,
            commit = self.params.commit_hours,
            engine = self.engine.name(),
            "starting rolling-horizon run"
        );

        let mut state = initial;
        for day in 0..self.params.sim_days {
            match self.run_day(day, &state, &mut log) {
                Ok(next) => state = next,
                Err(error) => {
                    tracing::warn!(day, %error, "run stopped");
                    return Err(RunFailure { error, log });
                }
            }
        }

        tracing::info!(
            days = log.days_completed(),
            objective = log.total_objective(),
            starts = log.total_starts(),
            "run complete"
        );
        Ok(log)
    }

    fn run_day(
        &mut self,
        day: usize,
        state: &InitialState,
        log: &mut SimulationLog,
    ) -> Result<InitialState, GridError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(GridError::Cancelled { day });
        }

        let window = HorizonWindow::for_day(day, self.params);
        let model = self.builder.build(&window, state)?;
        tracing::debug!(
            day,
            variables = model.num_vars(),
            constraints = model.num_constraints(),
            "solving window"
        );

        let outcome = self.engine.solve(&model, &self.budget);
        let (objective, assignment) = self.accept(day, &model, outcome.clone())?;
        if let Some(tolerance) = self.verify_tolerance {
            let violations = verify_assignment(&model, &assignment, tolerance);
            if let Some(worst) = violations
                .iter()
                .max_by(|a, b| a.amount.total_cmp(&b.amount))
            {
                return Err(GridError::SolverEngine {
                    day,
                    message: format!(
                        "{} returned an assignment with {} violation(s); worst is {} by {:.3e}",
                        self.engine.name(),
                        violations.len(),
                        worst.name,
                        worst.amount
                    ),
                });
            }
        }

        let summary = self.commit(&model, &assignment, objective, &outcome, log);
        let next = self.hand_off(&model, &assignment);

        tracing::info!(
            day,
            first_hour = summary.first_hour,
            last_hour = summary.last_hour,
            objective = summary.objective,
            seconds = summary.solve_seconds,
            starts = summary.units_started,
            "day committed"
        );
        if let Some(callback) = self.on_day.as_mut() {
            callback(&summary);
        }
        Ok(next)
    }

    fn accept(
        &self,
        day: usize,
        model: &WindowModel,
        outcome: SolveOutcome,
    ) -> Result<(f64, Assignment), GridError> {
        let message = outcome
            .message
            .clone()
            .unwrap_or_else(|| outcome.status.to_string());
        match outcome.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                match (outcome.objective, outcome.assignment) {
                    (Some(_), Some(assignment)) if assignment.len() != model.num_vars() => {
                        Err(GridError::SolverEngine {
                            day,
                            message: format!(
                                "{} returned {} value(s) for {} variable(s)",
                                self.engine.name(),
                                assignment.len(),
                                model.num_vars()
                            ),
                        })
                    }
                    (Some(objective), Some(assignment)) => Ok((objective, assignment)),
                    _ => Err(GridError::SolverEngine {
                        day,
                        message: format!("{} status without a solution", outcome.status),
                    }),
                }
            }
            SolveStatus::Infeasible => Err(GridError::SolveInfeasible { day, message }),
            SolveStatus::Unbounded => Err(GridError::SolveUnbounded { day }),
            SolveStatus::Timeout => Err(GridError::SolveTimeout {
                day,
                seconds: self
                    .budget
                    .time_limit
                    .map(|limit| limit.as_secs_f64())
                    .unwrap_or_else(|| outcome.elapsed.as_secs_f64()),
            }),
            SolveStatus::Error => Err(GridError::SolverEngine { day, message }),
        }
    }

    fn commit(
        &self,
        model: &WindowModel,
        assignment: &Assignment,
        objective: f64,
        outcome: &SolveOutcome,
        log: &mut SimulationLog,
    ) -> DaySummary {
        let window = model.window;
        let value = |family: VarFamily, entity: usize, hour: usize| {
            model
                .var(family, entity, hour)
                .and_then(|v| assignment.value(v))
                .unwrap_or(0.0)
        };

        let mut units_started = 0;
        for i in window.committed_hours() {
            let hour = window.absolute_hour(i);
            for (j, gen) in self.grid.generators().iter().enumerate() {
                let start = value(VarFamily::Start, j, i) > 0.5;
                if start {
                    units_started += 1;
                }
                log.units.push(UnitHour {
                    day: window.day,
                    hour,
                    generator: gen.id.clone(),
                    on: value(VarFamily::On, j, i) > 0.5,
                    start,
                    output_mw: value(VarFamily::Output, j, i),
                    spin_mw: value(VarFamily::Spin, j, i),
                    nonspin_mw: value(VarFamily::NonSpin, j, i),
                });
            }
            for (z, node) in self.grid.nodes().iter().enumerate() {
                log.nodes.push(NodeHour {
                    day: window.day,
                    hour,
                    node: node.id.clone(),
                    hydro_mw: if node.role == NodeRole::Hydro {
                        value(VarFamily::Hydro, z, i)
                    } else {
                        0.0
                    },
                    solar_mw: if node.role == NodeRole::Solar {
                        value(VarFamily::Solar, z, i)
                    } else {
                        0.0
                    },
                    angle: value(VarFamily::Angle, z, i),
                });
            }
        }

        let summary = DaySummary {
            day: window.day,
            first_hour: window.first_hour,
            last_hour: window.absolute_hour(window.commit),
            objective,
            solve_seconds: outcome.elapsed.as_secs_f64(),
            variables: model.num_vars(),
            constraints: model.num_constraints(),
            units_started,
        };
        log.days.push(summary.clone());
        summary
    }

    /// State at the last committed hour, rounded to clean 0/1 commitment.
    fn hand_off(&self, model: &WindowModel, assignment: &Assignment) -> InitialState {
        let last = model.window.commit;
        self.grid
            .generators()
            .iter()
            .enumerate()
            .map(|(j, gen)| {
                let on = model
                    .var(VarFamily::On, j, last)
                    .and_then(|v| assignment.value(v))
                    .is_some_and(|v| v > 0.5);
                let output = model
                    .var(VarFamily::Output, j, last)
                    .and_then(|v| assignment.value(v))
                    .map(|v| v.max(0.0))
                    .unwrap_or(0.0);
                (gen.id.clone(), UnitState::new(on, output))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve::GoodLpEngine;
    use crate::test_utils::{flat_series, two_unit_grid};
    use std::cell::RefCell;
    use std::time::Duration;

    struct Scripted(Vec<SolveStatus>, std::sync::Mutex<usize>);

    impl MilpEngine for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&self, model: &WindowModel, _budget: &SolveBudget) -> SolveOutcome {
            let mut calls = self.1.lock().unwrap();
            let status = self.0[*calls];
            *calls += 1;
            if status == SolveStatus::Optimal {
                GoodLpEngine::default().solve(model, &SolveBudget::unlimited())
            } else {
                SolveOutcome::failed(status, "scripted failure", Duration::ZERO)
            }
        }
    }

    fn params(days: usize) -> RunParameters {
        RunParameters {
            sim_hours: 4 * days,
            sim_days: days,
            horizon_hours: 4,
            commit_hours: 4,
            ..RunParameters::default()
        }
    }

    #[test]
    fn test_failure_keeps_committed_days() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 12, 100.0);
        let params = params(3);
        let engine = Scripted(
            vec![SolveStatus::Optimal, SolveStatus::Infeasible, SolveStatus::Optimal],
            Default::default(),
        );

        let failure = RollingHorizon::new(&grid, &series, &params, &engine)
            .run(InitialState::cold(&grid))
            .unwrap_err();
        assert!(matches!(failure.error, GridError::SolveInfeasible { day: 1, .. }));
        assert_eq!(failure.log.days_completed(), 1);
        assert_eq!(failure.log.last_hour(), 4);
        assert_eq!(failure.log.units.len(), 4 * 2);
    }

    #[test]
    fn test_timeout_maps_to_timeout_error() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 4, 100.0);
        let params = params(1);
        let engine = Scripted(vec![SolveStatus::Timeout], Default::default());
        let failure = RollingHorizon::new(&grid, &series, &params, &engine)
            .with_budget(SolveBudget::with_time_limit(Duration::from_secs(3)))
            .run(InitialState::cold(&grid))
            .unwrap_err();
        match failure.error {
            GridError::SolveTimeout { day, seconds } => {
                assert_eq!(day, 0);
                assert_eq!(seconds, 3.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(failure.log.is_empty());
    }

    #[test]
    fn test_cancel_before_first_day() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 4, 100.0);
        let params = params(1);
        let engine = GoodLpEngine::default();
        let token = CancelToken::new();
        token.cancel();
        let failure = RollingHorizon::new(&grid, &series, &params, &engine)
            .with_cancel_token(token)
            .run(InitialState::cold(&grid))
            .unwrap_err();
        assert!(matches!(failure.error, GridError::Cancelled { day: 0 }));
        assert!(failure.to_string().starts_with("run stopped after 0 committed day(s)"));
    }

    #[test]
    fn test_callback_sees_each_day() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 8, 100.0);
        let params = params(2);
        let engine = GoodLpEngine::default();
        let seen = RefCell::new(Vec::new());
        let log = RollingHorizon::new(&grid, &series, &params, &engine)
            .on_day(|summary| seen.borrow_mut().push(summary.first_hour))
            .run(InitialState::cold(&grid))
            .unwrap();
        assert_eq!(seen.into_inner(), vec![1, 5]);
        assert_eq!(log.last_hour(), 8);
    }

    #[test]
    fn test_invalid_parameters_fail_before_solving() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 4, 100.0);
        let params = RunParameters {
            commit_hours: 6,
            ..params(1)
        };
        let engine = Scripted(Vec::new(), Default::default());
        let failure = RollingHorizon::new(&grid, &series, &params, &engine)
            .run(InitialState::cold(&grid))
            .unwrap_err();
        assert!(matches!(failure.error, GridError::Config(_)));
    }

    struct AllZero;

    impl MilpEngine for AllZero {
        fn name(&self) -> &str {
            "all-zero"
        }

        fn solve(&self, model: &WindowModel, _budget: &SolveBudget) -> SolveOutcome {
            let values = vec![0.0; model.num_vars()];
            SolveOutcome::optimal(0.0, Assignment::new(values), Duration::ZERO)
        }
    }

    struct Truncated(usize);

    impl MilpEngine for Truncated {
        fn name(&self) -> &str {
            "truncated"
        }

        fn solve(&self, model: &WindowModel, _budget: &SolveBudget) -> SolveOutcome {
            let values = vec![1.0; model.num_vars().saturating_sub(self.0)];
            SolveOutcome::optimal(0.0, Assignment::new(values), Duration::ZERO)
        }
    }

    #[test]
    fn test_short_assignment_is_rejected() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 4, 100.0);
        let params = params(1);
        for engine in [Truncated(1), Truncated(usize::MAX)] {
            let failure = RollingHorizon::new(&grid, &series, &params, &engine)
                .run(InitialState::cold(&grid))
                .unwrap_err();
            match failure.error {
                GridError::SolverEngine { day, message } => {
                    assert_eq!(day, 0);
                    assert!(message.starts_with("truncated returned"), "{message}");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(failure.log.is_empty());
        }
    }

    #[test]
    fn test_verification_rejects_bad_assignment() {
        let grid = two_unit_grid();
        let series = flat_series(&grid, 4, 100.0);
        let params = params(1);
        let failure = RollingHorizon::new(&grid, &series, &params, &AllZero)
            .with_verification(1e-6)
            .run(InitialState::cold(&grid))
            .unwrap_err();
        match failure.error {
            GridError::SolverEngine { day, message } => {
                assert_eq!(day, 0);
                assert!(message.starts_with("all-zero returned"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
