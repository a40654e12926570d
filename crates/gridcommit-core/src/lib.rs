//! # gridcommit-core: Grid, Fleet and Time-Series Model
//!
//! Static data for rolling-horizon unit commitment studies: the transmission
//! network, the dispatchable fleet, the hourly inputs that drive each planning
//! window, and the run parameters shared by every window.
//!
//! ## Design Philosophy
//!
//! Everything in this crate is loaded once per run and is read-only
//! afterwards, so a [`Grid`] and a [`TimeSeries`] can be shared by reference
//! across the whole rolling loop.
//!
//! - **Nodes** carry exactly one [`NodeRole`]. The role is a tag on the node,
//!   so a node can never sit in two role sets.
//! - **Generators** carry their owning node and [`FuelType`] as fields. The
//!   per-node and per-fuel partitions are views computed from those tags.
//! - **Lines** are stored in both directions with identical rating and
//!   susceptance; a missing pair means "not connected" (limit 0).
//!
//! ## Quick Start
//!
//! ```rust
//! use gridcommit_core::*;
//!
//! let grid = GridBuilder::new()
//!     .node("NORTH", NodeRole::ThermalWithDemand)
//!     .node("LAKE", NodeRole::Hydro)
//!     .line("LAKE", "NORTH", 120.0, 15.0)
//!     .generator(
//!         Generator::new("N1_GAS", "NORTH", FuelType::Gas)
//!             .with_capacity(20.0, 150.0)
//!             .with_costs(7.5, 3.3, 2.0, 1.0, 40.0),
//!     )
//!     .build()?;
//!
//! assert_eq!(grid.line_limit(&NodeId::new("NORTH"), &NodeId::new("LAKE")), 120.0);
//! assert_eq!(grid.generators().len(), 1);
//! # Ok::<(), GridError>(())
//! ```
//!
//! ## Modules
//!
//! - [`network`] - nodes, lines and the validated [`Grid`] container
//! - [`fleet`] - generator technical and cost attributes
//! - [`timeseries`] - hourly demand, renewable ceilings, derates, reserves
//! - [`params`] - immutable run parameters
//! - [`state`] - per-unit initial condition carried between windows
//! - [`schedule`] - committed per-hour results of a run
//! - [`diagnostics`] - non-fatal findings
//! - [`graph_utils`] - topology statistics and island detection

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod diagnostics;
pub mod error;
pub mod fleet;
pub mod graph_utils;
pub mod network;
pub mod params;
pub mod schedule;
pub mod state;
pub mod timeseries;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use fleet::{FuelType, Generator};
pub use network::{Grid, GridBuilder, LineRating, Node, NodeRole};
pub use params::RunParameters;
pub use schedule::{DaySummary, NodeHour, SimulationLog, UnitHour};
pub use state::{InitialState, UnitState};
pub use timeseries::{HourlySeries, TimeSeries, TimeSeriesBuilder};

// Newtype wrappers for identifiers. Input files name everything with
// free-form strings ("CORN1", "Gas_Unit_3"), so the ids wrap a String.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(String);

impl NodeId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        NodeId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl GenId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        GenId(value.into())
    }
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for GenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId::new(value)
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

impl From<&str> for GenId {
    fn from(value: &str) -> Self {
        GenId::new(value)
    }
}

impl From<String> for GenId {
    fn from(value: String) -> Self {
        GenId(value)
    }
}
