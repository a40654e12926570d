//! Dispatchable generating units
//!
//! A [`Generator`] is a thermal-style unit that takes part in unit
//! commitment: it has a binary on/off state, capacity bounds, ramp and
//! minimum up/down limits, and a cost structure
//!
//! ```text
//! hourly cost = maxcap · fix_om · on
//!             + maxcap · st_cost · start
//!             + output · (heat_rate · fuel_cost + var_om)
//! ```
//!
//! Hydro and solar are not generators; they are must-take-or-curtail
//! resources attached to their node (see [`NodeRole`](crate::NodeRole)).

use crate::{GenId, NodeId, UnitState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fuel / technology tag of a generator.
///
/// The four named variants are the types the reserve rules know about by
/// default; anything else read from a data file becomes [`FuelType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FuelType {
    Gas,
    Slack,
    Geothermal,
    Hydrogen,
    Other(String),
}

impl FuelType {
    /// Fuel types that count toward system reserve unless configured otherwise.
    pub fn default_reserve_eligible() -> Vec<FuelType> {
        vec![
            FuelType::Gas,
            FuelType::Slack,
            FuelType::Geothermal,
            FuelType::Hydrogen,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            FuelType::Gas => "gas",
            FuelType::Slack => "slack",
            FuelType::Geothermal => "geothermal",
            FuelType::Hydrogen => "hydrogen",
            FuelType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "gas" => FuelType::Gas,
            "slack" => FuelType::Slack,
            "geothermal" => FuelType::Geothermal,
            "hydrogen" => FuelType::Hydrogen,
            _ => FuelType::Other(normalized),
        })
    }
}

impl From<String> for FuelType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(fuel) => fuel,
            Err(never) => match never {},
        }
    }
}

impl From<FuelType> for String {
    fn from(value: FuelType) -> Self {
        value.as_str().to_string()
    }
}

/// Technical and economic attributes of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: GenId,
    /// Owning node; feeds that node's power balance
    pub node: NodeId,
    pub fuel: FuelType,
    /// Minimum stable output while committed (MW)
    pub min_mw: f64,
    /// Nameplate capacity (MW)
    pub max_mw: f64,
    /// Heat rate (MMBtu/MWh)
    pub heat_rate: f64,
    /// Unit fuel cost ($/MMBtu)
    pub fuel_cost: f64,
    /// Variable O&M ($/MWh)
    pub var_om: f64,
    /// Fixed O&M per MW of capacity per committed hour
    pub fix_om: f64,
    /// Start cost per MW of capacity
    pub start_cost: f64,
    /// Ramp limit (MW/h); infinite means unconstrained
    pub ramp_mw_per_h: f64,
    /// Minimum up time (h)
    pub min_up_h: u32,
    /// Minimum down time (h)
    pub min_down_h: u32,
    /// State to start from when a warm start is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warm_start: Option<UnitState>,
}

impl Generator {
    pub fn new(id: impl Into<GenId>, node: impl Into<NodeId>, fuel: FuelType) -> Self {
        Self {
            id: id.into(),
            node: node.into(),
            fuel,
            min_mw: 0.0,
            max_mw: 0.0,
            heat_rate: 0.0,
            fuel_cost: 0.0,
            var_om: 0.0,
            fix_om: 0.0,
            start_cost: 0.0,
            ramp_mw_per_h: f64::INFINITY,
            min_up_h: 1,
            min_down_h: 1,
            warm_start: None,
        }
    }

    pub fn with_capacity(mut self, min_mw: f64, max_mw: f64) -> Self {
        self.min_mw = min_mw;
        self.max_mw = max_mw;
        self
    }

    /// Set heat rate, fuel cost, variable O&M, fixed O&M and start cost.
    pub fn with_costs(
        mut self,
        heat_rate: f64,
        fuel_cost: f64,
        var_om: f64,
        fix_om: f64,
        start_cost: f64,
    ) -> Self {
        self.heat_rate = heat_rate;
        self.fuel_cost = fuel_cost;
        self.var_om = var_om;
        self.fix_om = fix_om;
        self.start_cost = start_cost;
        self
    }

    pub fn with_ramp(mut self, ramp_mw_per_h: f64) -> Self {
        self.ramp_mw_per_h = ramp_mw_per_h;
        self
    }

    pub fn with_min_up_down(mut self, min_up_h: u32, min_down_h: u32) -> Self {
        self.min_up_h = min_up_h;
        self.min_down_h = min_down_h;
        self
    }

    pub fn with_warm_start(mut self, state: UnitState) -> Self {
        self.warm_start = Some(state);
        self
    }

    /// Energy cost per MWh dispatched.
    pub fn marginal_cost(&self) -> f64 {
        self.heat_rate * self.fuel_cost + self.var_om
    }

    /// Cost of one committed hour, independent of output.
    pub fn commitment_cost(&self) -> f64 {
        self.max_mw * self.fix_om
    }

    /// Cost of one start.
    pub fn startup_cost(&self) -> f64 {
        self.max_mw * self.start_cost
    }

    pub fn has_ramp_limit(&self) -> bool {
        self.ramp_mw_per_h.is_finite()
    }

    /// Problems with the unit's own numbers, independent of the grid.
    pub(crate) fn parameter_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let named = [
            ("mincap", self.min_mw),
            ("maxcap", self.max_mw),
            ("heat_rate", self.heat_rate),
            ("gen_cost", self.fuel_cost),
            ("var_om", self.var_om),
            ("fix_om", self.fix_om),
            ("st_cost", self.start_cost),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                problems.push(format!("{} must be finite and non-negative, got {}", name, value));
            }
        }
        if self.ramp_mw_per_h.is_nan() || self.ramp_mw_per_h < 0.0 {
            problems.push(format!("ramp must be non-negative, got {}", self.ramp_mw_per_h));
        }
        if self.min_mw > self.max_mw {
            problems.push(format!(
                "mincap {} exceeds maxcap {}",
                self.min_mw, self.max_mw
            ));
        }
        if let Some(state) = &self.warm_start {
            if !state.output_mw.is_finite() || state.output_mw < 0.0 {
                problems.push(format!("ini_mwh must be non-negative, got {}", state.output_mw));
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_type_parsing_is_case_insensitive() {
        assert_eq!("Gas".parse::<FuelType>().unwrap(), FuelType::Gas);
        assert_eq!("HYDROGEN".parse::<FuelType>().unwrap(), FuelType::Hydrogen);
        assert_eq!(
            "Biomass".parse::<FuelType>().unwrap(),
            FuelType::Other("biomass".into())
        );
    }

    #[test]
    fn test_fuel_type_serde_as_string() {
        let json = serde_json::to_string(&FuelType::Geothermal).unwrap();
        assert_eq!(json, "\"geothermal\"");
        let back: FuelType = serde_json::from_str("\"oil\"").unwrap();
        assert_eq!(back, FuelType::Other("oil".into()));
    }

    #[test]
    fn test_cost_components() {
        let gen = Generator::new("G1", "N1", FuelType::Gas)
            .with_capacity(10.0, 100.0)
            .with_costs(8.0, 3.0, 2.0, 0.5, 20.0);
        assert_eq!(gen.marginal_cost(), 26.0);
        assert_eq!(gen.commitment_cost(), 50.0);
        assert_eq!(gen.startup_cost(), 2000.0);
        assert!(!gen.has_ramp_limit());
        assert!(gen.parameter_problems().is_empty());
    }

    #[test]
    fn test_parameter_problems() {
        let gen = Generator::new("G1", "N1", FuelType::Slack)
            .with_capacity(120.0, 100.0)
            .with_ramp(-5.0);
        let problems = gen.parameter_problems();
        assert_eq!(problems.len(), 2);
        assert!(problems.iter().any(|p| p.contains("mincap")));
        assert!(problems.iter().any(|p| p.contains("ramp")));
    }
}
