use std::time::Instant;

use anyhow::{Context, Result};
use gridcommit_algo::{GoodLpEngine, RollingHorizon, SolveBudget};
use gridcommit_cli::cli::RunArgs;
use gridcommit_cli::config::RunConfig;
use gridcommit_core::{InitialState, SimulationLog};
use gridcommit_io::{load_model_data_with, ExportFormat, LogExport};
use tracing::{info, warn};

pub fn handle(args: &RunArgs) -> Result<()> {
    let started = Instant::now();
    let mut config = RunConfig::load_optional(args.config.as_deref())?;
    if args.backend.is_some() {
        config.backend = args.backend.clone();
    }
    if args.time_limit.is_some() {
        config.time_limit_seconds = args.time_limit;
    }
    if args.commit_hours.is_some() {
        config.commit_hours = args.commit_hours;
    }
    let format: ExportFormat = args.format.parse()?;
    let engine = GoodLpEngine::new(config.backend()?);
    let budget = SolveBudget {
        time_limit: config.time_limit()?,
    };

    let data = load_model_data_with(&args.input, &config.load_options())
        .with_context(|| format!("loading {}", args.input.display()))?;
    data.diagnostics.log();

    let mut params = data.params.clone();
    config.apply(&mut params);
    if let Some(days) = args.days {
        params.sim_days = days;
    }

    let initial = if args.warm_start {
        InitialState::warm(&data.grid)
    } else {
        InitialState::cold(&data.grid)
    };

    let mut driver = RollingHorizon::new(&data.grid, &data.series, &params, &engine)
        .with_budget(budget)
        .on_day(|day| {
            println!(
                "day {:>3}  hours {:>5}-{:<5} objective {:>14.2}  {:>7.2}s",
                day.day, day.first_hour, day.last_hour, day.objective, day.solve_seconds
            )
        });
    if args.verify {
        driver = driver.with_verification(1e-6);
    }

    let (log, failure) = match driver.run(initial) {
        Ok(log) => (log, None),
        Err(failure) => (failure.log, Some(failure.error)),
    };

    write_log(&log, args, format)?;
    info!(
        days = log.days_completed(),
        seconds = started.elapsed().as_secs_f64(),
        "run finished"
    );

    match failure {
        None => {
            println!(
                "Committed {} day(s), {} hours, total cost {:.2}, {} start(s) -> {}",
                log.days_completed(),
                log.last_hour(),
                log.total_objective(),
                log.total_starts(),
                args.out.display()
            );
            Ok(())
        }
        Some(error) => {
            warn!(
                committed_days = log.days_completed(),
                "partial log written to {}",
                args.out.display()
            );
            Err(error).context(format!(
                "run stopped after {} committed day(s)",
                log.days_completed()
            ))
        }
    }
}

fn write_log(log: &SimulationLog, args: &RunArgs, format: ExportFormat) -> Result<()> {
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    log.export(&args.out, format)
}
