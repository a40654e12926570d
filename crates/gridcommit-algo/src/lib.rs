//! # gridcommit-algo: Rolling-Horizon Unit Commitment
//!
//! This crate turns a [`gridcommit_core::Grid`], its hourly inputs and the run
//! parameters into a sequence of mixed-integer programs, one per day, and
//! stitches their leading hours into a single committed schedule.
//!
//! ## Per-window MILP
//!
//! Every window is formulated as a DC-network unit commitment problem:
//!
//! | Block | Variables | Rows |
//! |-------|-----------|------|
//! | Commitment | `on`, `switch` (binary) | start linking, min up / min down |
//! | Dispatch | `output` | capacity with derate, ramp limits |
//! | Reserves | `srsv`, `nrsv` | eligibility, headroom, system requirement |
//! | Network | `theta`, `hydro`, `solar` | nodal balance with losses, line limits |
//!
//! The model is an engine-independent value ([`formulation::WindowModel`]).
//! Solving goes through the [`solve::MilpEngine`] trait; the bundled
//! [`solve::GoodLpEngine`] uses `good_lp` with microlp, or HiGHS when the
//! `solver-highs` feature is enabled.
//!
//! ## Rolling driver
//!
//! [`RollingHorizon`] solves day after day. Each day commits its first
//! `commit_hours` and hands the commitment and output at the last committed
//! hour to the next window. A failure stops the run and returns the days
//! already committed alongside the error.
//!
//! ## Example
//!
//! ```ignore
//! use gridcommit_algo::{GoodLpEngine, RollingHorizon};
//! use gridcommit_core::InitialState;
//! use gridcommit_io::load_model_data;
//!
//! let data = load_model_data("model.dat".as_ref())?;
//! let engine = GoodLpEngine::default();
//! let log = RollingHorizon::new(&data.grid, &data.series, &data.params, &engine)
//!     .run(InitialState::cold(&data.grid))?;
//! println!("total cost: {:.2}", log.total_objective());
//! ```

pub mod formulation;
pub mod rolling;
pub mod solve;
pub mod test_utils;
pub mod verify;
pub mod window;

pub use formulation::{ConstraintFamily, ModelBuilder, VarFamily, WindowModel};
pub use rolling::{CancelToken, RollingHorizon, RunFailure};
pub use solve::{
    run_with_budget, Assignment, GoodLpEngine, MilpBackend, MilpEngine, SolveBudget, SolveOutcome,
    SolveStatus,
};
pub use verify::{verify_assignment, Violation};
pub use window::HorizonWindow;
