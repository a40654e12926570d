//! Window formulation: unit commitment with DC network and reserves
//!
//! For a window of `H` free hours (hour 0 pinned to the initial condition):
//!
//! ```text
//! start link      on[i] - on[i-1] - switch[i]          <= 0
//!                 switch[i] - M·on[i]                  <= 0
//!                 switch[i] + M·on[i-1]                <= M
//! min up          on[i] - on[i-1] - on[k]              <= 0   k = i+1 ..= min(i+minup-1, H)
//! min down        on[i-1] - on[i] + on[k]              <= 1   k = i+1 ..= min(i+mindn-1, H)
//! ramp            |output[i] - output[i-1]|            <= ramp
//! capacity        mincap·on[i] <= output[i] <= maxcap·derate[i]·on[i]
//! reserves        srsv[i] <= maxcap·derate[i]·on[i]
//!                 nrsv[i] <= maxcap·derate[i]·(1 - on[i])
//!                 output[i] + srsv[i] + nrsv[i]        <= maxcap·derate[i]
//! balance         (1-loss)·gen[z,i] - Σk sus(z,k)·(θ[z,i] - θ[k,i]) = demand[z,i]
//! line limit      |sus(s,k)·(θ[s,i] - θ[k,i])|        <= n1·limit(s,k)
//! system reserve  Σ srsv + nrsv >= R[i],  Σ srsv >= spin_margin·R[i]
//! ```
//!
//! Look-ahead in the minimum up/down rows is truncated at the end of the
//! window; nothing wraps around.

use super::model::{ConstraintFamily, LinearExpr, Sense, VarFamily, VarId, VarKind, VarSpec, WindowModel};
use crate::window::HorizonWindow;
use gridcommit_core::{
    Grid, GridError, GridResult, HourlySeries, InitialState, NodeRole, RunParameters, TimeSeries,
    UnitState,
};

/// Builds [`WindowModel`]s from shared, read-only inputs.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder<'a> {
    grid: &'a Grid,
    series: &'a TimeSeries,
    params: &'a RunParameters,
}

/// Variables of one generator. `output`/`on` hold hours `0..=H`, the rest
/// hours `1..=H` at position `i - 1`.
struct UnitVars {
    output: Vec<VarId>,
    on: Vec<VarId>,
    start: Vec<VarId>,
    spin: Vec<VarId>,
    nonspin: Vec<VarId>,
}

/// Variables of one node for hours `1..=H` at position `i - 1`.
struct NodeVars {
    dispatch: Option<Vec<VarId>>,
    angle: Vec<VarId>,
}

/// Time-series slices for the window, one value per free hour.
struct WindowInputs<'s> {
    derate: Vec<&'s [f64]>,
    demand: Vec<Option<&'s [f64]>>,
    ceiling: Vec<Option<&'s [f64]>>,
    reserves: &'s [f64],
}

impl<'a> ModelBuilder<'a> {
    pub fn new(grid: &'a Grid, series: &'a TimeSeries, params: &'a RunParameters) -> Self {
        Self {
            grid,
            series,
            params,
        }
    }

    pub fn build(&self, window: &HorizonWindow, initial: &InitialState) -> GridResult<WindowModel> {
        let day = window.day;
        let horizon = window.horizon;
        let inputs = self.slice_inputs(window)?;
        let reference = self.reference_node(day)?;

        let states = self
            .grid
            .generators()
            .iter()
            .map(|gen| {
                initial.get(&gen.id).copied().ok_or_else(|| {
                    GridError::construction(day, format!("generator {}", gen.id), "no initial state")
                })
            })
            .collect::<GridResult<Vec<UnitState>>>()?;

        let mut model = WindowModel::new(*window);
        let units = self.unit_vars(&mut model, horizon);
        let nodes = self.node_vars(&mut model, horizon);

        self.commitment_rows(&mut model, &units, &states, &inputs, horizon);
        self.network_rows(&mut model, &units, &nodes, &inputs, reference, horizon);
        self.reserve_rows(&mut model, &units, &inputs, horizon);

        tracing::debug!(
            day,
            first_hour = window.first_hour,
            variables = model.num_vars(),
            binaries = model.num_binaries(),
            constraints = model.num_constraints(),
            "built window model"
        );
        Ok(model)
    }

    fn slice_inputs(&self, window: &HorizonWindow) -> GridResult<WindowInputs<'a>> {
        let slice = |series: Option<&'a HourlySeries>, entity: String| -> GridResult<&'a [f64]> {
            let series = series.ok_or_else(|| {
                GridError::construction(window.day, &entity, "no series for this entity")
            })?;
            series
                .window(window.first_hour, window.horizon)
                .ok_or_else(|| {
                    GridError::construction(
                        window.day,
                        &entity,
                        format!(
                            "series ends at hour {} but the window needs hours {}..={}",
                            series.len(),
                            window.first_hour,
                            window.last_hour()
                        ),
                    )
                })
        };

        let derate = self
            .grid
            .generators()
            .iter()
            .map(|gen| slice(self.series.derate(&gen.id), format!("SimDeratef[{}]", gen.id)))
            .collect::<GridResult<Vec<_>>>()?;

        let mut demand = Vec::with_capacity(self.grid.nodes().len());
        let mut ceiling = Vec::with_capacity(self.grid.nodes().len());
        for node in self.grid.nodes() {
            demand.push(if node.role.has_demand() {
                Some(slice(
                    self.series.demand(&node.id),
                    format!("SimDemand[{}]", node.id),
                )?)
            } else {
                None
            });
            ceiling.push(match node.role {
                NodeRole::Hydro => Some(slice(
                    self.series.hydro(&node.id),
                    format!("SimHydro[{}]", node.id),
                )?),
                NodeRole::Solar => Some(slice(
                    self.series.solar(&node.id),
                    format!("SimSolar[{}]", node.id),
                )?),
                _ => None,
            });
        }

        let reserves = slice(Some(&self.series.reserves), "SimReserves".to_string())?;
        Ok(WindowInputs {
            derate,
            demand,
            ceiling,
            reserves,
        })
    }

    fn reference_node(&self, day: usize) -> GridResult<usize> {
        match &self.params.reference_node {
            Some(id) => self.grid.node_index(id).ok_or_else(|| {
                GridError::construction(day, format!("reference node {}", id), "not in the grid")
            }),
            None => Ok(0),
        }
    }

    fn unit_vars(&self, model: &mut WindowModel, horizon: usize) -> Vec<UnitVars> {
        let mut all = Vec::with_capacity(self.grid.generators().len());
        for (j, gen) in self.grid.generators().iter().enumerate() {
            let label = gen.id.as_str();
            let mut vars = UnitVars {
                output: Vec::with_capacity(horizon + 1),
                on: Vec::with_capacity(horizon + 1),
                start: Vec::with_capacity(horizon),
                spin: Vec::with_capacity(horizon),
                nonspin: Vec::with_capacity(horizon),
            };
            // Boundary hour: pinned by equality rows, not free decisions.
            vars.output.push(model.add_var(continuous(VarFamily::Output, j, label, 0, 0.0, f64::INFINITY)));
            vars.on.push(model.add_var(continuous(VarFamily::On, j, label, 0, 0.0, 1.0)));
            for i in 1..=horizon {
                vars.output.push(model.add_var(continuous(VarFamily::Output, j, label, i, 0.0, f64::INFINITY)));
                vars.on.push(model.add_var(binary(VarFamily::On, j, label, i)));
                vars.start.push(model.add_var(binary(VarFamily::Start, j, label, i)));
                vars.spin.push(model.add_var(continuous(VarFamily::Spin, j, label, i, 0.0, f64::INFINITY)));
                vars.nonspin.push(model.add_var(continuous(VarFamily::NonSpin, j, label, i, 0.0, f64::INFINITY)));
            }
            all.push(vars);
        }
        all
    }

    fn node_vars(&self, model: &mut WindowModel, horizon: usize) -> Vec<NodeVars> {
        let mut all = Vec::with_capacity(self.grid.nodes().len());
        for (z, node) in self.grid.nodes().iter().enumerate() {
            let label = node.id.as_str();
            let family = match node.role {
                NodeRole::Hydro => Some(VarFamily::Hydro),
                NodeRole::Solar => Some(VarFamily::Solar),
                _ => None,
            };
            let dispatch = family.map(|family| {
                (1..=horizon)
                    .map(|i| model.add_var(continuous(family, z, label, i, 0.0, f64::INFINITY)))
                    .collect()
            });
            let angle = (1..=horizon)
                .map(|i| {
                    model.add_var(continuous(
                        VarFamily::Angle,
                        z,
                        label,
                        i,
                        f64::NEG_INFINITY,
                        f64::INFINITY,
                    ))
                })
                .collect();
            all.push(NodeVars { dispatch, angle });
        }
        all
    }

    fn commitment_rows(
        &self,
        model: &mut WindowModel,
        units: &[UnitVars],
        states: &[UnitState],
        inputs: &WindowInputs<'_>,
        horizon: usize,
    ) {
        let big_m = self.params.big_m;
        for (j, gen) in self.grid.generators().iter().enumerate() {
            let v = &units[j];
            let id = gen.id.as_str();

            model.add_constraint(
                format!("initial_on[{}]", id),
                ConstraintFamily::InitialCommitment,
                LinearExpr::new().term(v.on[0], 1.0),
                Sense::Eq,
                states[j].on_value(),
            );
            model.add_constraint(
                format!("initial_output[{}]", id),
                ConstraintFamily::InitialOutput,
                LinearExpr::new().term(v.output[0], 1.0),
                Sense::Eq,
                states[j].output_mw,
            );

            for i in 1..=horizon {
                let on = v.on[i];
                let prev_on = v.on[i - 1];
                let output = v.output[i];
                let start = v.start[i - 1];
                let spin = v.spin[i - 1];
                let nonspin = v.nonspin[i - 1];
                let available = gen.max_mw * inputs.derate[j][i - 1];

                model.add_constraint(
                    format!("start_link[{},{}]", id, i),
                    ConstraintFamily::StartLink,
                    LinearExpr::new().term(on, 1.0).term(prev_on, -1.0).term(start, -1.0),
                    Sense::Le,
                    0.0,
                );
                model.add_constraint(
                    format!("start_on[{},{}]", id, i),
                    ConstraintFamily::StartRequiresOn,
                    LinearExpr::new().term(start, 1.0).term(on, -big_m),
                    Sense::Le,
                    0.0,
                );
                model.add_constraint(
                    format!("start_prev_off[{},{}]", id, i),
                    ConstraintFamily::StartRequiresPrevOff,
                    LinearExpr::new().term(start, 1.0).term(prev_on, big_m),
                    Sense::Le,
                    big_m,
                );

                let up_end = (i + gen.min_up_h as usize).saturating_sub(1).min(horizon);
                for k in i + 1..=up_end {
                    model.add_constraint(
                        format!("min_up[{},{},{}]", id, i, k),
                        ConstraintFamily::MinUp,
                        LinearExpr::new()
                            .term(on, 1.0)
                            .term(prev_on, -1.0)
                            .term(v.on[k], -1.0),
                        Sense::Le,
                        0.0,
                    );
                }
                let down_end = (i + gen.min_down_h as usize).saturating_sub(1).min(horizon);
                for k in i + 1..=down_end {
                    model.add_constraint(
                        format!("min_down[{},{},{}]", id, i, k),
                        ConstraintFamily::MinDown,
                        LinearExpr::new()
                            .term(prev_on, 1.0)
                            .term(on, -1.0)
                            .term(v.on[k], 1.0),
                        Sense::Le,
                        1.0,
                    );
                }

                if gen.has_ramp_limit() {
                    let delta = LinearExpr::new().term(output, 1.0).term(v.output[i - 1], -1.0);
                    model.add_constraint(
                        format!("ramp_up[{},{}]", id, i),
                        ConstraintFamily::RampUp,
                        delta.clone(),
                        Sense::Le,
                        gen.ramp_mw_per_h,
                    );
                    model.add_constraint(
                        format!("ramp_down[{},{}]", id, i),
                        ConstraintFamily::RampDown,
                        delta,
                        Sense::Ge,
                        -gen.ramp_mw_per_h,
                    );
                }

                model.add_constraint(
                    format!("cap_max[{},{}]", id, i),
                    ConstraintFamily::CapacityMax,
                    LinearExpr::new().term(output, 1.0).term(on, -available),
                    Sense::Le,
                    0.0,
                );
                model.add_constraint(
                    format!("cap_min[{},{}]", id, i),
                    ConstraintFamily::CapacityMin,
                    LinearExpr::new().term(output, 1.0).term(on, -gen.min_mw),
                    Sense::Ge,
                    0.0,
                );
                model.add_constraint(
                    format!("spin_on[{},{}]", id, i),
                    ConstraintFamily::SpinEligibility,
                    LinearExpr::new().term(spin, 1.0).term(on, -available),
                    Sense::Le,
                    0.0,
                );
                model.add_constraint(
                    format!("nonspin_off[{},{}]", id, i),
                    ConstraintFamily::NonSpinEligibility,
                    LinearExpr::new().term(nonspin, 1.0).term(on, available),
                    Sense::Le,
                    available,
                );
                model.add_constraint(
                    format!("zero_sum[{},{}]", id, i),
                    ConstraintFamily::ZeroSum,
                    LinearExpr::new()
                        .term(output, 1.0)
                        .term(spin, 1.0)
                        .term(nonspin, 1.0),
                    Sense::Le,
                    available,
                );

                model.objective.add_term(on, gen.commitment_cost());
                model.objective.add_term(start, gen.startup_cost());
                model.objective.add_term(output, gen.marginal_cost());
            }
        }
    }

    fn network_rows(
        &self,
        model: &mut WindowModel,
        units: &[UnitVars],
        nodes: &[NodeVars],
        inputs: &WindowInputs<'_>,
        reference: usize,
        horizon: usize,
    ) {
        let delivered = 1.0 - self.params.trans_loss;
        for (z, node) in self.grid.nodes().iter().enumerate() {
            let id = node.id.as_str();
            let nv = &nodes[z];
            let total_sus: f64 = self.grid.neighbours(z).map(|(_, r)| r.susceptance).sum();

            for i in 1..=horizon {
                if let (Some(dispatch), Some(ceiling)) = (&nv.dispatch, inputs.ceiling[z]) {
                    let family = if node.role == NodeRole::Hydro {
                        ConstraintFamily::HydroCeiling
                    } else {
                        ConstraintFamily::SolarCeiling
                    };
                    model.add_constraint(
                        format!("{}[{},{}]", family, id, i),
                        family,
                        LinearExpr::new().term(dispatch[i - 1], 1.0),
                        Sense::Le,
                        ceiling[i - 1],
                    );
                }

                let mut balance = LinearExpr::new();
                if let Some(dispatch) = &nv.dispatch {
                    balance.add_term(dispatch[i - 1], delivered);
                }
                for &j in self.grid.generators_at(z) {
                    balance.add_term(units[j].output[i], delivered);
                }
                balance.add_term(nv.angle[i - 1], -total_sus);
                for (k, rating) in self.grid.neighbours(z) {
                    balance.add_term(nodes[k].angle[i - 1], rating.susceptance);
                }
                let demand = inputs.demand[z].map(|d| d[i - 1]).unwrap_or(0.0);
                model.add_constraint(
                    format!("balance[{},{}]", id, i),
                    ConstraintFamily::NodalBalance,
                    balance,
                    Sense::Eq,
                    demand,
                );

                if z == reference {
                    model.add_constraint(
                        format!("ref_angle[{},{}]", id, i),
                        ConstraintFamily::ReferenceAngle,
                        LinearExpr::new().term(nv.angle[i - 1], 1.0),
                        Sense::Eq,
                        0.0,
                    );
                }
            }
        }

        let n1 = self.params.n1_criterion;
        for (s, k, rating) in self.grid.directed_lines() {
            if rating.limit_mva <= 0.0 {
                continue;
            }
            let pair = format!(
                "{},{}",
                self.grid.nodes()[s].id,
                self.grid.nodes()[k].id
            );
            for i in 1..=horizon {
                let flow = LinearExpr::new()
                    .term(nodes[s].angle[i - 1], rating.susceptance)
                    .term(nodes[k].angle[i - 1], -rating.susceptance);
                model.add_constraint(
                    format!("line_max[{},{}]", pair, i),
                    ConstraintFamily::LineLimitUpper,
                    flow.clone(),
                    Sense::Le,
                    n1 * rating.limit_mva,
                );
                model.add_constraint(
                    format!("line_min[{},{}]", pair, i),
                    ConstraintFamily::LineLimitLower,
                    flow,
                    Sense::Ge,
                    -n1 * rating.limit_mva,
                );
            }
        }
    }

    fn reserve_rows(
        &self,
        model: &mut WindowModel,
        units: &[UnitVars],
        inputs: &WindowInputs<'_>,
        horizon: usize,
    ) {
        let eligible: Vec<usize> = self
            .grid
            .generators()
            .iter()
            .enumerate()
            .filter(|(_, gen)| self.params.is_reserve_eligible(&gen.fuel))
            .map(|(j, _)| j)
            .collect();

        for i in 1..=horizon {
            let requirement = inputs.reserves[i - 1];
            let mut total = LinearExpr::new();
            let mut spinning = LinearExpr::new();
            for &j in &eligible {
                total.add_term(units[j].spin[i - 1], 1.0);
                total.add_term(units[j].nonspin[i - 1], 1.0);
                spinning.add_term(units[j].spin[i - 1], 1.0);
            }
            model.add_constraint(
                format!("reserve[{}]", i),
                ConstraintFamily::ReserveTotal,
                total,
                Sense::Ge,
                requirement,
            );
            model.add_constraint(
                format!("reserve_spin[{}]", i),
                ConstraintFamily::ReserveSpinning,
                spinning,
                Sense::Ge,
                self.params.spin_margin * requirement,
            );
        }
    }
}

fn continuous(
    family: VarFamily,
    entity: usize,
    label: &str,
    hour: usize,
    lower: f64,
    upper: f64,
) -> VarSpec {
    VarSpec {
        name: format!("{}[{},{}]", family.as_str(), label, hour),
        family,
        entity,
        hour,
        kind: VarKind::Continuous,
        lower,
        upper,
    }
}

fn binary(family: VarFamily, entity: usize, label: &str, hour: usize) -> VarSpec {
    VarSpec {
        name: format!("{}[{},{}]", family.as_str(), label, hour),
        family,
        entity,
        hour,
        kind: VarKind::Binary,
        lower: 0.0,
        upper: 1.0,
    }
}
