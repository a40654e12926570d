//! Run scalars and driver settings shared by every planning window.

use crate::{FuelType, GridError, GridResult, NodeId};
use serde::{Deserialize, Serialize};

/// Immutable run parameters shared by every planning window.
///
/// The first six fields come from the model-data file; the remainder are
/// driver settings with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    /// Hours covered by the input series
    pub sim_hours: usize,
    /// Number of rolling windows to solve
    pub sim_days: usize,
    /// Free hours per window (H)
    pub horizon_hours: usize,
    /// Fraction of local generation lost before reaching the node balance
    pub trans_loss: f64,
    /// Multiplier on line limits (N-1 derating)
    pub n1_criterion: f64,
    /// Share of the reserve requirement that must be spinning
    pub spin_margin: f64,
    /// Hours committed per window before rolling forward
    pub commit_hours: usize,
    /// Constant used by the start-indicator linearisation
    pub big_m: f64,
    /// Node whose angle is pinned to zero; first declared node when unset
    pub reference_node: Option<NodeId>,
    /// Fuel types whose units may hold reserve
    pub reserve_eligible: Vec<FuelType>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            sim_hours: 24,
            sim_days: 1,
            horizon_hours: 24,
            trans_loss: 0.0,
            n1_criterion: 1.0,
            spin_margin: 0.5,
            commit_hours: 24,
            big_m: 1e5,
            reference_node: None,
            reserve_eligible: FuelType::default_reserve_eligible(),
        }
    }
}

impl RunParameters {
    /// Last absolute hour touched by the window for `day`.
    pub fn window_end(&self, day: usize) -> usize {
        day * self.commit_hours + self.horizon_hours
    }

    /// Total hours committed to the log by a complete run.
    pub fn committed_hours(&self) -> usize {
        self.sim_days * self.commit_hours
    }

    pub fn is_reserve_eligible(&self, fuel: &FuelType) -> bool {
        self.reserve_eligible.contains(fuel)
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.horizon_hours == 0 {
            return Err(GridError::Config("HorizonHours must be at least 1".into()));
        }
        if self.commit_hours == 0 || self.commit_hours > self.horizon_hours {
            return Err(GridError::Config(format!(
                "commit_hours must be between 1 and HorizonHours ({}), got {}",
                self.horizon_hours, self.commit_hours
            )));
        }
        if !(0.0..1.0).contains(&self.trans_loss) {
            return Err(GridError::Config(format!(
                "TransLoss must be in [0, 1), got {}",
                self.trans_loss
            )));
        }
        if !self.n1_criterion.is_finite() || self.n1_criterion < 0.0 {
            return Err(GridError::Config(format!(
                "n1criterion must be non-negative, got {}",
                self.n1_criterion
            )));
        }
        if !(0.0..=1.0).contains(&self.spin_margin) {
            return Err(GridError::Config(format!(
                "spin_margin must be in [0, 1], got {}",
                self.spin_margin
            )));
        }
        if !self.big_m.is_finite() || self.big_m < 1.0 {
            return Err(GridError::Config(format!(
                "big_m must be finite and at least 1, got {}",
                self.big_m
            )));
        }
        Ok(())
    }
}
