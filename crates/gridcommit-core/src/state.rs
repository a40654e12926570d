//! Per-unit condition at the boundary hour of a planning window.

use crate::{GenId, Grid, GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Commitment and output of one unit at a single hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub on: bool,
    pub output_mw: f64,
}

impl UnitState {
    pub const OFF: UnitState = UnitState {
        on: false,
        output_mw: 0.0,
    };

    pub fn new(on: bool, output_mw: f64) -> Self {
        Self { on, output_mw }
    }

    /// Commitment as the 0/1 value used in the formulation.
    pub fn on_value(&self) -> f64 {
        if self.on {
            1.0
        } else {
            0.0
        }
    }
}

/// Initial condition of every generator, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitialState {
    units: BTreeMap<GenId, UnitState>,
}

impl InitialState {
    /// Every unit off and at zero output.
    pub fn cold(grid: &Grid) -> Self {
        Self {
            units: grid
                .generators()
                .iter()
                .map(|g| (g.id.clone(), UnitState::OFF))
                .collect(),
        }
    }

    /// Per-unit warm-start values where the fleet carries them, cold otherwise.
    pub fn warm(grid: &Grid) -> Self {
        Self {
            units: grid
                .generators()
                .iter()
                .map(|g| (g.id.clone(), g.warm_start.unwrap_or(UnitState::OFF)))
                .collect(),
        }
    }

    pub fn set(&mut self, id: GenId, state: UnitState) {
        self.units.insert(id, state);
    }

    pub fn get(&self, id: &GenId) -> Option<&UnitState> {
        self.units.get(id)
    }

    /// State of `id`, or an integrity error naming the missing unit.
    pub fn require(&self, id: &GenId) -> GridResult<UnitState> {
        self.units
            .get(id)
            .copied()
            .ok_or_else(|| GridError::integrity(format!("generator {}", id), "no initial state"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GenId, &UnitState)> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn committed_count(&self) -> usize {
        self.units.values().filter(|s| s.on).count()
    }
}

impl FromIterator<(GenId, UnitState)> for InitialState {
    fn from_iter<T: IntoIterator<Item = (GenId, UnitState)>>(iter: T) -> Self {
        Self {
            units: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FuelType, Generator, GridBuilder, NodeRole};

    fn grid() -> Grid {
        GridBuilder::new()
            .node("N", NodeRole::ThermalWithoutDemand)
            .generator(Generator::new("G1", "N", FuelType::Gas).with_capacity(0.0, 50.0))
            .generator(
                Generator::new("G2", "N", FuelType::Slack)
                    .with_capacity(0.0, 90.0)
                    .with_warm_start(UnitState::new(true, 45.0)),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_cold_start() {
        let state = InitialState::cold(&grid());
        assert_eq!(state.len(), 2);
        assert_eq!(state.committed_count(), 0);
        assert_eq!(state.get(&GenId::new("G2")), Some(&UnitState::OFF));
    }

    #[test]
    fn test_warm_start_uses_fleet_values() {
        let state = InitialState::warm(&grid());
        assert_eq!(state.committed_count(), 1);
        assert_eq!(
            state.require(&GenId::new("G2")).unwrap(),
            UnitState::new(true, 45.0)
        );
        assert_eq!(state.require(&GenId::new("G1")).unwrap(), UnitState::OFF);
    }

    #[test]
    fn test_missing_unit() {
        let state = InitialState::default();
        assert!(matches!(
            state.require(&GenId::new("G9")),
            Err(GridError::DataIntegrity { .. })
        ));
    }
}
