//! Committed results of a rolling run.
//!
//! Records are appended one window at a time and never rewritten; only the
//! first `commit_hours` of each solved window reach the log.

use crate::{GenId, NodeId};
use serde::{Deserialize, Serialize};

/// Per generator per committed hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitHour {
    pub day: usize,
    /// Absolute hour (1-based)
    pub hour: usize,
    pub generator: GenId,
    pub on: bool,
    pub start: bool,
    pub output_mw: f64,
    pub spin_mw: f64,
    pub nonspin_mw: f64,
}

/// Per node per committed hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHour {
    pub day: usize,
    pub hour: usize,
    pub node: NodeId,
    pub hydro_mw: f64,
    pub solar_mw: f64,
    /// Voltage angle (rad)
    pub angle: f64,
}

/// Solve statistics of one accepted window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: usize,
    pub first_hour: usize,
    pub last_hour: usize,
    /// Objective of the full window, not only the committed hours
    pub objective: f64,
    pub solve_seconds: f64,
    pub variables: usize,
    pub constraints: usize,
    pub units_started: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationLog {
    pub units: Vec<UnitHour>,
    pub nodes: Vec<NodeHour>,
    pub days: Vec<DaySummary>,
}

impl SimulationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days_completed(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Last absolute hour present in the log, 0 when empty.
    pub fn last_hour(&self) -> usize {
        self.days.last().map(|d| d.last_hour).unwrap_or(0)
    }

    pub fn unit_hours<'a>(&'a self, gen: &'a GenId) -> impl Iterator<Item = &'a UnitHour> {
        self.units.iter().filter(move |u| &u.generator == gen)
    }

    pub fn unit_at(&self, gen: &GenId, hour: usize) -> Option<&UnitHour> {
        self.units
            .iter()
            .find(|u| u.hour == hour && &u.generator == gen)
    }

    pub fn node_at(&self, node: &NodeId, hour: usize) -> Option<&NodeHour> {
        self.nodes.iter().find(|n| n.hour == hour && &n.node == node)
    }

    /// Thermal output summed over the fleet at `hour`.
    pub fn thermal_output(&self, hour: usize) -> f64 {
        self.units
            .iter()
            .filter(|u| u.hour == hour)
            .map(|u| u.output_mw)
            .sum()
    }

    /// Sum of the per-window objectives.
    pub fn total_objective(&self) -> f64 {
        self.days.iter().map(|d| d.objective).sum()
    }

    pub fn total_starts(&self) -> usize {
        self.units.iter().filter(|u| u.start).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(hour: usize, gen: &str, output: f64, start: bool) -> UnitHour {
        UnitHour {
            day: 0,
            hour,
            generator: GenId::new(gen),
            on: output > 0.0,
            start,
            output_mw: output,
            spin_mw: 0.0,
            nonspin_mw: 0.0,
        }
    }

    #[test]
    fn test_queries() {
        let log = SimulationLog {
            units: vec![
                unit(1, "A", 60.0, true),
                unit(1, "B", 40.0, true),
                unit(2, "A", 70.0, false),
                unit(2, "B", 0.0, false),
            ],
            nodes: vec![],
            days: vec![DaySummary {
                day: 0,
                first_hour: 1,
                last_hour: 2,
                objective: 1234.5,
                solve_seconds: 0.1,
                variables: 10,
                constraints: 20,
                units_started: 2,
            }],
        };
        assert_eq!(log.thermal_output(1), 100.0);
        assert_eq!(log.unit_hours(&GenId::new("A")).count(), 2);
        assert_eq!(log.unit_at(&GenId::new("B"), 2).map(|u| u.on), Some(false));
        assert_eq!(log.last_hour(), 2);
        assert_eq!(log.total_starts(), 2);
        assert_eq!(log.total_objective(), 1234.5);
    }

    #[test]
    fn test_empty_log() {
        let log = SimulationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.last_hour(), 0);
    }
}
