//! Independent feasibility check of an assignment against a [`WindowModel`].
//!
//! Used by tests and by `gridcommit run --verify` to confirm that whatever
//! the engine returned satisfies every bound, integrality requirement and
//! constraint of the model it was given.

use crate::formulation::{VarKind, WindowModel};
use crate::solve::Assignment;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Constraint or variable name
    pub name: String,
    /// Constraint family, or "bound"/"integrality" for variables
    pub family: String,
    pub amount: f64,
}

pub fn verify_assignment(
    model: &WindowModel,
    assignment: &Assignment,
    tolerance: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if assignment.len() != model.num_vars() {
        violations.push(Violation {
            name: "assignment".into(),
            family: "shape".into(),
            amount: (assignment.len() as f64 - model.num_vars() as f64).abs(),
        });
        return violations;
    }
    let values = assignment.values();

    for (spec, &value) in model.variables.iter().zip(values) {
        let below = spec.lower - value;
        let above = value - spec.upper;
        let excess = below.max(above);
        if excess > tolerance {
            violations.push(Violation {
                name: spec.name.clone(),
                family: "bound".into(),
                amount: excess,
            });
        }
        if spec.kind == VarKind::Binary {
            let gap = (value - value.round()).abs();
            if gap > tolerance {
                violations.push(Violation {
                    name: spec.name.clone(),
                    family: "integrality".into(),
                    amount: gap,
                });
            }
        }
    }

    for c in &model.constraints {
        let amount = c.violation(values);
        if amount > tolerance {
            violations.push(Violation {
                name: c.name.clone(),
                family: c.family.to_string(),
                amount,
            });
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::{ConstraintFamily, LinearExpr, Sense, VarFamily, VarSpec};
    use crate::window::HorizonWindow;

    fn model() -> WindowModel {
        let mut model = WindowModel::new(HorizonWindow {
            day: 0,
            first_hour: 1,
            horizon: 1,
            commit: 1,
        });
        let on = model.add_var(VarSpec {
            name: "on[G,1]".into(),
            family: VarFamily::On,
            entity: 0,
            hour: 1,
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        });
        let out = model.add_var(VarSpec {
            name: "output[G,1]".into(),
            family: VarFamily::Output,
            entity: 0,
            hour: 1,
            kind: VarKind::Continuous,
            lower: 0.0,
            upper: f64::INFINITY,
        });
        model.add_constraint(
            "cap_max[G,1]".into(),
            ConstraintFamily::CapacityMax,
            LinearExpr::new().term(out, 1.0).term(on, -50.0),
            Sense::Le,
            0.0,
        );
        model
    }

    #[test]
    fn test_clean_assignment() {
        let found = verify_assignment(&model(), &Assignment::new(vec![1.0, 40.0]), 1e-6);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_reports_each_kind_of_violation() {
        let found = verify_assignment(&model(), &Assignment::new(vec![0.5, 40.0]), 1e-6);
        let families: Vec<&str> = found.iter().map(|v| v.family.as_str()).collect();
        assert_eq!(families, vec!["integrality", "cap_max"]);
        assert!((found[1].amount - 15.0).abs() < 1e-9);

        let found = verify_assignment(&model(), &Assignment::new(vec![1.0, -3.0]), 1e-6);
        assert_eq!(found[0].name, "output[G,1]");
        assert_eq!(found[0].family, "bound");
    }

    #[test]
    fn test_wrong_length() {
        let found = verify_assignment(&model(), &Assignment::new(vec![1.0]), 1e-6);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].family, "shape");
    }
}
