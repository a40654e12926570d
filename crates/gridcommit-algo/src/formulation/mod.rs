//! Per-window MILP: the engine-independent model and the builder that fills it.

mod builder;
mod model;

pub use builder::ModelBuilder;
pub use model::{
    Constraint, ConstraintFamily, LinearExpr, Sense, VarFamily, VarId, VarKind, VarSpec,
    WindowModel,
};
