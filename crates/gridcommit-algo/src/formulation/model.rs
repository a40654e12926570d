//! Engine-independent MILP for one planning window.
//!
//! A [`WindowModel`] is a plain value: named variables with bounds and
//! integrality, named constraints tagged by family, and a linear objective.
//! Building the same window twice yields equal models, and any engine that
//! can read this structure can solve it.

use crate::window::HorizonWindow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a variable in [`WindowModel::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    Continuous,
    Binary,
}

/// What a variable stands for. Unit families are indexed by generator
/// position, node families by node position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarFamily {
    Output,
    On,
    Start,
    Spin,
    NonSpin,
    Hydro,
    Solar,
    Angle,
}

impl VarFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarFamily::Output => "output",
            VarFamily::On => "on",
            VarFamily::Start => "switch",
            VarFamily::Spin => "srsv",
            VarFamily::NonSpin => "nrsv",
            VarFamily::Hydro => "hydro",
            VarFamily::Solar => "solar",
            VarFamily::Angle => "theta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarSpec {
    pub name: String,
    pub family: VarFamily,
    /// Generator or node position
    pub entity: usize,
    /// Window-local hour
    pub hour: usize,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

/// `Σ coef · var + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "==",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFamily {
    InitialCommitment,
    InitialOutput,
    StartLink,
    StartRequiresOn,
    StartRequiresPrevOff,
    MinUp,
    MinDown,
    RampUp,
    RampDown,
    CapacityMax,
    CapacityMin,
    SpinEligibility,
    NonSpinEligibility,
    ZeroSum,
    HydroCeiling,
    SolarCeiling,
    NodalBalance,
    ReferenceAngle,
    LineLimitUpper,
    LineLimitLower,
    ReserveTotal,
    ReserveSpinning,
}

impl ConstraintFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintFamily::InitialCommitment => "initial_on",
            ConstraintFamily::InitialOutput => "initial_output",
            ConstraintFamily::StartLink => "start_link",
            ConstraintFamily::StartRequiresOn => "start_on",
            ConstraintFamily::StartRequiresPrevOff => "start_prev_off",
            ConstraintFamily::MinUp => "min_up",
            ConstraintFamily::MinDown => "min_down",
            ConstraintFamily::RampUp => "ramp_up",
            ConstraintFamily::RampDown => "ramp_down",
            ConstraintFamily::CapacityMax => "cap_max",
            ConstraintFamily::CapacityMin => "cap_min",
            ConstraintFamily::SpinEligibility => "spin_on",
            ConstraintFamily::NonSpinEligibility => "nonspin_off",
            ConstraintFamily::ZeroSum => "zero_sum",
            ConstraintFamily::HydroCeiling => "hydro_max",
            ConstraintFamily::SolarCeiling => "solar_max",
            ConstraintFamily::NodalBalance => "balance",
            ConstraintFamily::ReferenceAngle => "ref_angle",
            ConstraintFamily::LineLimitUpper => "line_max",
            ConstraintFamily::LineLimitLower => "line_min",
            ConstraintFamily::ReserveTotal => "reserve",
            ConstraintFamily::ReserveSpinning => "reserve_spin",
        }
    }
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `expr (sense) rhs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub family: ConstraintFamily,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    /// Amount by which `values` violate the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.eval(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }
}

/// Per-window solver input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowModel {
    pub window: HorizonWindow,
    pub variables: Vec<VarSpec>,
    pub constraints: Vec<Constraint>,
    /// Minimised
    pub objective: LinearExpr,
    #[serde(skip)]
    index: BTreeMap<(VarFamily, usize, usize), VarId>,
}

impl WindowModel {
    pub fn new(window: HorizonWindow) -> Self {
        Self {
            window,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn add_var(&mut self, spec: VarSpec) -> VarId {
        let id = VarId(self.variables.len());
        self.index.insert((spec.family, spec.entity, spec.hour), id);
        self.variables.push(spec);
        id
    }

    pub fn add_constraint(
        &mut self,
        name: String,
        family: ConstraintFamily,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name,
            family,
            expr,
            sense,
            rhs,
        });
    }

    /// Variable of `family` for the given generator/node position and window hour.
    pub fn var(&self, family: VarFamily, entity: usize, hour: usize) -> Option<VarId> {
        self.index.get(&(family, entity, hour)).copied()
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints_of(
        &self,
        family: ConstraintFamily,
    ) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.family == family)
    }

    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.constraints {
            *counts.entry(c.family).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> HorizonWindow {
        HorizonWindow {
            day: 0,
            first_hour: 1,
            horizon: 2,
            commit: 2,
        }
    }

    #[test]
    fn test_expression_eval_and_violation() {
        let mut model = WindowModel::new(window());
        let x = model.add_var(VarSpec {
            name: "x".into(),
            family: VarFamily::Output,
            entity: 0,
            hour: 1,
            kind: VarKind::Continuous,
            lower: 0.0,
            upper: 10.0,
        });
        let y = model.add_var(VarSpec {
            name: "y".into(),
            family: VarFamily::On,
            entity: 0,
            hour: 1,
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        });
        let expr = LinearExpr::new().term(x, 1.0).term(y, -10.0);
        model.add_constraint("cap".into(), ConstraintFamily::CapacityMax, expr, Sense::Le, 0.0);

        let c = &model.constraints[0];
        assert_eq!(c.violation(&[5.0, 1.0]), 0.0);
        assert_eq!(c.violation(&[5.0, 0.0]), 5.0);
        assert_eq!(model.var(VarFamily::On, 0, 1), Some(y));
        assert_eq!(model.var(VarFamily::On, 0, 2), None);
        assert_eq!(model.num_binaries(), 1);
    }

    #[test]
    fn test_zero_coefficients_dropped() {
        let expr = LinearExpr::new().term(VarId(0), 0.0).term(VarId(1), 2.0);
        assert_eq!(expr.terms, vec![(VarId(1), 2.0)]);
    }

    #[test]
    fn test_family_counts() {
        let mut model = WindowModel::new(window());
        for name in ["a", "b"] {
            model.add_constraint(
                name.into(),
                ConstraintFamily::RampUp,
                LinearExpr::new(),
                Sense::Le,
                1.0,
            );
        }
        let counts = model.family_counts();
        assert_eq!(counts[&ConstraintFamily::RampUp], 2);
        assert_eq!(model.constraints_of(ConstraintFamily::RampDown).count(), 0);
    }
}
