//! Hourly inputs indexed by absolute hour `1..=SimHours`
//!
//! | Series | Keyed by | Meaning |
//! |--------|----------|---------|
//! | demand | demand node | load (MW) |
//! | hydro | hydro node | dispatch ceiling (MW) |
//! | solar | solar node | dispatch ceiling (MW) |
//! | derate | generator | multiplier on `maxcap` |
//! | reserves | system | reserve requirement (MW) |

use crate::{GenId, Grid, GridError, GridResult, NodeId, NodeRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default reserve requirement as a share of total demand.
pub const DEFAULT_RESERVE_MARGIN: f64 = 0.15;

/// One series over absolute hours, starting at hour 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HourlySeries {
    values: Vec<f64>,
}

impl HourlySeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Build from `(hour, value)` pairs in any order. Hours must cover
    /// `1..=n` exactly once.
    pub fn from_hour_values(
        pairs: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<Self, String> {
        let mut by_hour = BTreeMap::new();
        for (hour, value) in pairs {
            if hour == 0 {
                return Err("hours start at 1".to_string());
            }
            if by_hour.insert(hour, value).is_some() {
                return Err(format!("hour {} given twice", hour));
            }
        }
        let mut values = Vec::with_capacity(by_hour.len());
        for (expected, (hour, value)) in (1..).zip(by_hour) {
            if hour != expected {
                return Err(format!("hour {} missing", expected));
            }
            values.push(value);
        }
        Ok(Self { values })
    }

    /// Value at absolute `hour` (1-based).
    pub fn get(&self, hour: usize) -> Option<f64> {
        hour.checked_sub(1).and_then(|i| self.values.get(i)).copied()
    }

    /// `len` consecutive values starting at absolute hour `first`, or
    /// `None` when the series ends too early.
    pub fn window(&self, first: usize, len: usize) -> Option<&[f64]> {
        let start = first.checked_sub(1)?;
        self.values.get(start..start + len)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// All hourly inputs of a run. Loaded once, sliced per window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub demand: BTreeMap<NodeId, HourlySeries>,
    pub hydro: BTreeMap<NodeId, HourlySeries>,
    pub solar: BTreeMap<NodeId, HourlySeries>,
    pub derate: BTreeMap<GenId, HourlySeries>,
    pub reserves: HourlySeries,
}

impl TimeSeries {
    pub fn demand(&self, node: &NodeId) -> Option<&HourlySeries> {
        self.demand.get(node)
    }

    pub fn hydro(&self, node: &NodeId) -> Option<&HourlySeries> {
        self.hydro.get(node)
    }

    pub fn solar(&self, node: &NodeId) -> Option<&HourlySeries> {
        self.solar.get(node)
    }

    pub fn derate(&self, gen: &GenId) -> Option<&HourlySeries> {
        self.derate.get(gen)
    }

    /// Sum of all nodal demand at absolute `hour`.
    pub fn total_demand(&self, hour: usize) -> f64 {
        self.demand.values().filter_map(|s| s.get(hour)).sum()
    }

    /// Shortest series length, i.e. the last hour every series covers.
    pub fn covered_hours(&self) -> usize {
        self.demand
            .values()
            .chain(self.hydro.values())
            .chain(self.solar.values())
            .chain(self.derate.values())
            .chain(std::iter::once(&self.reserves))
            .map(HourlySeries::len)
            .min()
            .unwrap_or(0)
    }

    /// Check keys and values against the grid.
    ///
    /// Each table's key space must equal its node or generator set: extra
    /// keys, missing series and negative or non-finite values are errors.
    pub fn validate_against(&self, grid: &Grid) -> GridResult<()> {
        let node_tables = [
            ("SimDemand", &self.demand, None),
            ("SimHydro", &self.hydro, Some(NodeRole::Hydro)),
            ("SimSolar", &self.solar, Some(NodeRole::Solar)),
        ];
        for (table, series, role) in node_tables {
            for (id, values) in series {
                let node = grid.node(id).ok_or_else(|| {
                    GridError::integrity(format!("{} {}", table, id), "unknown node")
                })?;
                let allowed = match role {
                    Some(role) => node.role == role,
                    None => node.role.has_demand(),
                };
                if !allowed {
                    return Err(GridError::integrity(
                        format!("{} {}", table, id),
                        format!("node has role {}", node.role),
                    ));
                }
                check_values(&format!("{} {}", table, id), values)?;
            }
            for node in grid.nodes() {
                let needed = match role {
                    Some(role) => node.role == role,
                    None => node.role.has_demand(),
                };
                if needed && !series.contains_key(&node.id) {
                    return Err(GridError::integrity(
                        format!("{} {}", table, node.id),
                        format!("node has role {} but no series", node.role),
                    ));
                }
            }
        }

        for (id, values) in &self.derate {
            if grid.generator(id).is_none() {
                return Err(GridError::integrity(
                    format!("SimDeratef {}", id),
                    "unknown generator",
                ));
            }
            check_values(&format!("SimDeratef {}", id), values)?;
        }
        for gen in grid.generators() {
            if !self.derate.contains_key(&gen.id) {
                return Err(GridError::integrity(
                    format!("SimDeratef {}", gen.id),
                    "generator has no series",
                ));
            }
        }

        check_values("SimReserves", &self.reserves)?;
        Ok(())
    }

    /// Every series must cover exactly hours `1..=hours`.
    pub fn check_hours(&self, hours: usize) -> GridResult<()> {
        let keyed = [
            ("SimDemand", &self.demand),
            ("SimHydro", &self.hydro),
            ("SimSolar", &self.solar),
        ];
        let named = keyed
            .into_iter()
            .flat_map(|(table, series)| {
                series
                    .iter()
                    .map(move |(id, values)| (format!("{} {}", table, id), values))
            })
            .chain(
                self.derate
                    .iter()
                    .map(|(id, values)| (format!("SimDeratef {}", id), values)),
            )
            .chain(std::iter::once(("SimReserves".to_string(), &self.reserves)));
        for (entity, values) in named {
            if values.len() != hours {
                return Err(GridError::integrity(
                    entity,
                    format!("covers hours 1..={} but SimHours is {}", values.len(), hours),
                ));
            }
        }
        Ok(())
    }
}

fn check_values(entity: &str, series: &HourlySeries) -> GridResult<()> {
    for (idx, value) in series.values().iter().enumerate() {
        if !value.is_finite() || *value < 0.0 {
            return Err(GridError::integrity(
                entity,
                format!("hour {} has invalid value {}", idx + 1, value),
            ));
        }
    }
    Ok(())
}

/// Builder for [`TimeSeries`]; derives the reserve requirement from demand
/// when no explicit reserve series is supplied.
#[derive(Debug)]
pub struct TimeSeriesBuilder {
    series: TimeSeries,
    reserves_given: bool,
    reserve_margin: f64,
}

impl Default for TimeSeriesBuilder {
    fn default() -> Self {
        Self {
            series: TimeSeries::default(),
            reserves_given: false,
            reserve_margin: DEFAULT_RESERVE_MARGIN,
        }
    }
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn demand(mut self, node: impl Into<NodeId>, values: Vec<f64>) -> Self {
        self.series
            .demand
            .insert(node.into(), HourlySeries::new(values));
        self
    }

    pub fn hydro(mut self, node: impl Into<NodeId>, values: Vec<f64>) -> Self {
        self.series
            .hydro
            .insert(node.into(), HourlySeries::new(values));
        self
    }

    pub fn solar(mut self, node: impl Into<NodeId>, values: Vec<f64>) -> Self {
        self.series
            .solar
            .insert(node.into(), HourlySeries::new(values));
        self
    }

    pub fn derate(mut self, gen: impl Into<GenId>, values: Vec<f64>) -> Self {
        self.series
            .derate
            .insert(gen.into(), HourlySeries::new(values));
        self
    }

    pub fn reserves(mut self, values: Vec<f64>) -> Self {
        self.series.reserves = HourlySeries::new(values);
        self.reserves_given = true;
        self
    }

    pub fn reserve_margin(mut self, margin: f64) -> Self {
        self.reserve_margin = margin;
        self
    }

    pub fn build(mut self) -> TimeSeries {
        if !self.reserves_given {
            let hours = self
                .series
                .demand
                .values()
                .map(HourlySeries::len)
                .min()
                .unwrap_or(0);
            let derived = (1..=hours)
                .map(|h| self.reserve_margin * self.series.total_demand(h))
                .collect();
            self.series.reserves = HourlySeries::new(derived);
        }
        self.series
    }
}
