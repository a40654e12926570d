//! Small fixtures shared by unit and integration tests.

use gridcommit_core::{
    FuelType, Generator, Grid, GridBuilder, NodeRole, TimeSeries, TimeSeriesBuilder,
};

/// One demand node served by a cheap 80 MW unit and a pricier 100 MW unit.
///
/// Marginal costs are 10 and 50 per MWh; no fixed, start or ramp costs.
pub fn two_unit_grid() -> Grid {
    GridBuilder::new()
        .node("N", NodeRole::ThermalWithDemand)
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
        .expect("two-unit grid is valid")
}

/// Constant series over `hours`: `demand` at every demand node, zero
/// renewable availability, full capacity and no reserve requirement.
pub fn flat_series(grid: &Grid, hours: usize, demand: f64) -> TimeSeries {
    let mut builder = TimeSeriesBuilder::new().reserves(vec![0.0; hours]);
    for node in grid.nodes() {
        if node.role.has_demand() {
            builder = builder.demand(node.id.clone(), vec![demand; hours]);
        }
        match node.role {
            NodeRole::Hydro => builder = builder.hydro(node.id.clone(), vec![0.0; hours]),
            NodeRole::Solar => builder = builder.solar(node.id.clone(), vec![0.0; hours]),
            _ => {}
        }
    }
    for gen in grid.generators() {
        builder = builder.derate(gen.id.clone(), vec![1.0; hours]);
    }
    builder.build()
}
