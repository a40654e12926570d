//! Single-window dispatch scenarios with hand-checkable optima

use gridcommit_algo::test_utils::{flat_series, two_unit_grid};
use gridcommit_algo::{
    verify_assignment, GoodLpEngine, HorizonWindow, MilpEngine, ModelBuilder, RollingHorizon,
    SolveBudget, SolveStatus,
};
use gridcommit_core::{
    FuelType, GenId, Generator, Grid, GridBuilder, InitialState, NodeId, NodeRole, RunParameters,
    SimulationLog, TimeSeries, TimeSeriesBuilder, UnitState,
};

const TOL: f64 = 1e-4;

fn params(hours: usize) -> RunParameters {
    RunParameters {
        sim_hours: hours,
        sim_days: 1,
        horizon_hours: hours,
        commit_hours: hours,
        ..RunParameters::default()
    }
}

fn run(grid: &Grid, series: &TimeSeries, params: &RunParameters) -> SimulationLog {
    run_from(grid, series, params, InitialState::cold(grid))
}

fn run_from(
    grid: &Grid,
    series: &TimeSeries,
    params: &RunParameters,
    initial: InitialState,
) -> SimulationLog {
    let engine = GoodLpEngine::default();
    RollingHorizon::new(grid, series, params, &engine)
        .with_verification(1e-5)
        .run(initial)
        .unwrap()
}

fn output(log: &SimulationLog, gen: &str, hour: usize) -> f64 {
    log.unit_at(&GenId::new(gen), hour).unwrap().output_mw
}

fn on(log: &SimulationLog, gen: &str, hour: usize) -> bool {
    log.unit_at(&GenId::new(gen), hour).unwrap().on
}

/// Two units on one node: the cheap one runs flat out and the expensive
/// one covers the remainder.
#[test]
fn merit_order_on_single_node() {
    let grid = two_unit_grid();
    let series = flat_series(&grid, 4, 100.0);
    let log = run(&grid, &series, &params(4));

    for hour in 1..=4 {
        assert!((output(&log, "CHEAP", hour) - 80.0).abs() < TOL);
        assert!((output(&log, "PRICEY", hour) - 20.0).abs() < TOL);
        assert!((log.thermal_output(hour) - 100.0).abs() < TOL);
    }
    assert!((log.total_objective() - 7200.0).abs() < 1e-3);
    assert_eq!(log.total_starts(), 2);
}

fn hydro_grid() -> Grid {
    GridBuilder::new()
        .node("N", NodeRole::ThermalWithDemand)
        .node("H", NodeRole::Hydro)
        .line("N", "H", 100.0, 10.0)
        .generator(
            Generator::new("CHEAP", "N", FuelType::Gas)
                .with_capacity(0.0, 80.0)
                .with_costs(1.0, 10.0, 0.0, 0.0, 0.0),
        )
        .generator(
            Generator::new("PRICEY", "N", FuelType::Gas)
                .with_capacity(0.0, 100.0)
                .with_costs(1.0, 50.0, 0.0, 0.0, 0.0),
        )
        .build()
        .unwrap()
}

fn hydro_series(ceiling: f64) -> TimeSeries {
    TimeSeriesBuilder::new()
        .demand("N", vec![100.0; 3])
        .hydro("H", vec![ceiling; 3])
        .derate("CHEAP", vec![1.0; 3])
        .derate("PRICEY", vec![1.0; 3])
        .reserves(vec![0.0; 3])
        .build()
}

#[test]
fn hydro_ceiling_of_zero_blocks_dispatch() {
    let grid = hydro_grid();
    let log = run(&grid, &hydro_series(0.0), &params(3));
    for hour in 1..=3 {
        let node = log.node_at(&NodeId::new("H"), hour).unwrap();
        assert!(node.hydro_mw.abs() < TOL);
        assert!((log.thermal_output(hour) - 100.0).abs() < TOL);
    }
}

#[test]
fn free_hydro_used_up_to_ceiling() {
    let grid = hydro_grid();
    let log = run(&grid, &hydro_series(30.0), &params(3));
    for hour in 1..=3 {
        let node = log.node_at(&NodeId::new("H"), hour).unwrap();
        assert!((node.hydro_mw - 30.0).abs() < TOL);
        assert!((output(&log, "CHEAP", hour) - 70.0).abs() < TOL);
        assert!(output(&log, "PRICEY", hour).abs() < TOL);
    }
}

/// Cheap generation behind a line into the load node.
fn corridor_grid() -> Grid {
    GridBuilder::new()
        .node("A", NodeRole::ThermalWithoutDemand)
        .node("B", NodeRole::ThermalWithDemand)
        .line("A", "B", 60.0, 10.0)
        .generator(
            Generator::new("REMOTE", "A", FuelType::Gas)
                .with_capacity(0.0, 200.0)
                .with_costs(1.0, 10.0, 0.0, 0.0, 0.0),
        )
        .generator(
            Generator::new("LOCAL", "B", FuelType::Gas)
                .with_capacity(0.0, 200.0)
                .with_costs(1.0, 50.0, 0.0, 0.0, 0.0),
        )
        .build()
        .unwrap()
}

#[test]
fn line_limit_binds_cheap_import() {
    let grid = corridor_grid();
    let series = flat_series(&grid, 2, 100.0);
    let log = run(&grid, &series, &params(2));
    for hour in 1..=2 {
        assert!((output(&log, "REMOTE", hour) - 60.0).abs() < TOL);
        assert!((output(&log, "LOCAL", hour) - 40.0).abs() < TOL);
        // Reference angle at A; flow 60 = 10·(0 - θB)
        let a = log.node_at(&NodeId::new("A"), hour).unwrap();
        let b = log.node_at(&NodeId::new("B"), hour).unwrap();
        assert!(a.angle.abs() < TOL);
        assert!((b.angle + 6.0).abs() < TOL);
    }
}

#[test]
fn n1_criterion_derates_line() {
    let grid = corridor_grid();
    let series = flat_series(&grid, 2, 100.0);
    let params = RunParameters {
        n1_criterion: 0.5,
        ..params(2)
    };
    let log = run(&grid, &series, &params);
    assert!((output(&log, "REMOTE", 1) - 30.0).abs() < TOL);
    assert!((output(&log, "LOCAL", 1) - 70.0).abs() < TOL);
}

#[test]
fn losses_scale_delivered_generation() {
    let grid = two_unit_grid();
    let series = flat_series(&grid, 1, 95.0);
    let params = RunParameters {
        trans_loss: 0.05,
        ..params(1)
    };
    let log = run(&grid, &series, &params);
    // 0.95 · gen = 95
    assert!((log.thermal_output(1) - 100.0).abs() < TOL);
}

#[test]
fn reserve_requirement_is_met_by_eligible_units() {
    let grid = two_unit_grid();
    let series = TimeSeriesBuilder::new()
        .demand("N", vec![100.0; 2])
        .derate("CHEAP", vec![1.0; 2])
        .derate("PRICEY", vec![1.0; 2])
        .reserves(vec![50.0; 2])
        .build();
    let log = run(&grid, &series, &params(2));

    for hour in 1..=2 {
        let units: Vec<_> = log.units.iter().filter(|u| u.hour == hour).collect();
        let spin: f64 = units.iter().map(|u| u.spin_mw).sum();
        let total: f64 = units.iter().map(|u| u.spin_mw + u.nonspin_mw).sum();
        assert!(total >= 50.0 - TOL, "total reserve {total}");
        assert!(spin >= 25.0 - TOL, "spinning reserve {spin}");
        for u in &units {
            assert!(u.on || u.spin_mw.abs() < TOL, "{} spins while off", u.generator);
            assert!(!u.on || u.nonspin_mw.abs() < TOL, "{} non-spins while on", u.generator);
        }
    }
}

#[test]
fn ineligible_fuel_cannot_carry_reserve() {
    let grid = two_unit_grid();
    let series = TimeSeriesBuilder::new()
        .demand("N", vec![100.0])
        .derate("CHEAP", vec![1.0])
        .derate("PRICEY", vec![1.0])
        .reserves(vec![10.0])
        .build();
    let params = RunParameters {
        reserve_eligible: vec![FuelType::Hydrogen],
        ..params(1)
    };
    let window = HorizonWindow::for_day(0, &params);
    let model = ModelBuilder::new(&grid, &series, &params)
        .build(&window, &InitialState::cold(&grid))
        .unwrap();
    let outcome = GoodLpEngine::default().solve(&model, &SolveBudget::unlimited());
    assert_eq!(outcome.status, SolveStatus::Infeasible);
}

#[test]
fn solved_window_passes_independent_check() {
    let grid = hydro_grid();
    let series = hydro_series(25.0);
    let params = params(3);
    let window = HorizonWindow::for_day(0, &params);
    let model = ModelBuilder::new(&grid, &series, &params)
        .build(&window, &InitialState::cold(&grid))
        .unwrap();
    let outcome = GoodLpEngine::default().solve(&model, &SolveBudget::unlimited());
    assert_eq!(outcome.status, SolveStatus::Optimal);
    let violations = verify_assignment(&model, outcome.assignment.as_ref().unwrap(), 1e-5);
    assert!(violations.is_empty(), "{violations:?}");
}

/// A ramp-limited cheap unit starting cold climbs by exactly its ramp
/// each hour while the peaker fills in.
#[test]
fn ramp_limit_paces_cold_start() {
    let grid = GridBuilder::new()
        .node("N", NodeRole::ThermalWithDemand)
        .generator(
            Generator::new("RAMPY", "N", FuelType::Gas)
                .with_capacity(0.0, 200.0)
                .with_costs(1.0, 10.0, 0.0, 0.0, 0.0)
                .with_ramp(30.0),
        )
        .generator(
            Generator::new("PEAKER", "N", FuelType::Gas)
                .with_capacity(0.0, 200.0)
                .with_costs(1.0, 50.0, 0.0, 0.0, 0.0),
        )
        .build()
        .unwrap();
    let series = flat_series(&grid, 4, 100.0);
    let log = run(&grid, &series, &params(4));

    let expected = [30.0, 60.0, 90.0, 100.0];
    for (hour, want) in (1..=4).zip(expected) {
        assert!((output(&log, "RAMPY", hour) - want).abs() < TOL, "hour {hour}");
        assert!((output(&log, "PEAKER", hour) - (100.0 - want)).abs() < TOL);
    }
    // 280 MWh at 10 plus 120 MWh at 50
    assert!((log.total_objective() - 8800.0).abs() < 1e-3);
}

/// One node with a unit that is cheap to run but carries an hourly
/// commitment cost, and a backup with energy cost only.
fn commitment_grid(id: &str, min_up: u32, min_down: u32, backup_cost: f64) -> Grid {
    GridBuilder::new()
        .node("N", NodeRole::ThermalWithDemand)
        .generator(
            Generator::new(id, "N", FuelType::Gas)
                .with_capacity(0.0, 100.0)
                .with_costs(1.0, 10.0, 0.0, 10.0, 1.0)
                .with_min_up_down(min_up, min_down),
        )
        .generator(
            Generator::new("BACKUP", "N", FuelType::Gas)
                .with_capacity(0.0, 100.0)
                .with_costs(1.0, backup_cost, 0.0, 0.0, 0.0),
        )
        .build()
        .unwrap()
}

fn demand_series(grid: &Grid, demand: Vec<f64>) -> TimeSeries {
    let hours = demand.len();
    let mut builder = TimeSeriesBuilder::new().demand("N", demand);
    for gen in grid.generators() {
        builder = builder.derate(gen.id.as_str(), vec![1.0; hours]);
    }
    builder.reserves(vec![0.0; hours]).build()
}

/// STIFF runs into the window and is idle for two hours. Shutting down
/// locks it out for three hours, so the last hour falls to BACKUP.
#[test]
fn min_down_keeps_unit_off_after_shutdown() {
    let grid = commitment_grid("STIFF", 1, 3, 25.0);
    let series = demand_series(&grid, vec![100.0, 0.0, 0.0, 100.0]);
    let mut initial = InitialState::cold(&grid);
    initial.set(GenId::new("STIFF"), UnitState::new(true, 100.0));
    let log = run_from(&grid, &series, &params(4), initial);

    let stiff = log.unit_at(&GenId::new("STIFF"), 1).unwrap();
    assert!(stiff.on && !stiff.start);
    assert!((stiff.output_mw - 100.0).abs() < TOL);
    for hour in 2..=4 {
        assert!(!on(&log, "STIFF", hour), "hour {hour}");
    }
    assert!((output(&log, "BACKUP", 4) - 100.0).abs() < TOL);
    // 2000 + 0 + 0 + 2500
    assert!((log.total_objective() - 4500.0).abs() < 1e-3);
}

#[test]
fn unit_restarts_without_min_down() {
    let grid = commitment_grid("STIFF", 1, 1, 25.0);
    let series = demand_series(&grid, vec![100.0, 0.0, 0.0, 100.0]);
    let mut initial = InitialState::cold(&grid);
    initial.set(GenId::new("STIFF"), UnitState::new(true, 100.0));
    let log = run_from(&grid, &series, &params(4), initial);

    assert!(!on(&log, "STIFF", 2));
    assert!(!on(&log, "STIFF", 3));
    let restart = log.unit_at(&GenId::new("STIFF"), 4).unwrap();
    assert!(restart.on && restart.start);
    // 2000 + 0 + 0 + 2000 + start 100
    assert!((log.total_objective() - 4100.0).abs() < 1e-3);
}

/// A unit started for two busy hours must carry its commitment through
/// the idle third hour.
#[test]
fn min_up_holds_unit_on_through_idle_hour() {
    let grid = commitment_grid("UP", 3, 1, 30.0);
    let series = demand_series(&grid, vec![100.0, 100.0, 0.0, 0.0]);
    let log = run(&grid, &series, &params(4));

    let first = log.unit_at(&GenId::new("UP"), 1).unwrap();
    assert!(first.on && first.start);
    for hour in 1..=3 {
        assert!(on(&log, "UP", hour), "hour {hour}");
    }
    assert!(output(&log, "UP", 3).abs() < TOL);
    assert!(!on(&log, "UP", 4));
    assert_eq!(log.total_starts(), 1);
    // 2000 + 2000 + 1000 + start 100
    assert!((log.total_objective() - 5100.0).abs() < 1e-3);
}
