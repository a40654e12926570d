//! Transmission network and the validated [`Grid`] container
//!
//! ```text
//!    LAKE (hydro) ──── NORTH (thermal + demand) ──── SUB (transformer + demand)
//!                           │
//!                         gas / geothermal units
//! ```
//!
//! Node roles decide which terms appear in a node's power balance:
//!
//! | Role | Injection | Demand |
//! |------|-----------|--------|
//! | `Hydro` | hydro dispatch | - |
//! | `Solar` | solar dispatch | - |
//! | `ThermalWithDemand` | owned generators | yes |
//! | `ThermalWithoutDemand` | owned generators | - |
//! | `TransformerWithDemand` | - | yes |
//! | `TransformerWithoutDemand` | - | - |

use crate::diagnostics::Diagnostics;
use crate::graph_utils;
use crate::{FuelType, GenId, Generator, GridError, GridResult, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Role of a node in the nodal balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Hydro,
    Solar,
    ThermalWithDemand,
    ThermalWithoutDemand,
    TransformerWithDemand,
    TransformerWithoutDemand,
}

impl NodeRole {
    pub const ALL: [NodeRole; 6] = [
        NodeRole::Hydro,
        NodeRole::Solar,
        NodeRole::ThermalWithDemand,
        NodeRole::ThermalWithoutDemand,
        NodeRole::TransformerWithDemand,
        NodeRole::TransformerWithoutDemand,
    ];

    pub fn has_demand(&self) -> bool {
        matches!(
            self,
            NodeRole::ThermalWithDemand | NodeRole::TransformerWithDemand
        )
    }

    /// Whether generators may be attached to a node with this role.
    pub fn hosts_generators(&self) -> bool {
        matches!(
            self,
            NodeRole::ThermalWithDemand | NodeRole::ThermalWithoutDemand
        )
    }

    pub fn is_renewable(&self) -> bool {
        matches!(self, NodeRole::Hydro | NodeRole::Solar)
    }

    /// Name of the role set in model-data files.
    pub fn set_name(&self) -> &'static str {
        match self {
            NodeRole::Hydro => "h_nodes",
            NodeRole::Solar => "s_nodes",
            NodeRole::ThermalWithDemand => "gd_nodes",
            NodeRole::ThermalWithoutDemand => "gn_nodes",
            NodeRole::TransformerWithDemand => "td_nodes",
            NodeRole::TransformerWithoutDemand => "tn_nodes",
        }
    }

    pub fn from_set_name(name: &str) -> Option<NodeRole> {
        NodeRole::ALL.into_iter().find(|role| role.set_name() == name)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeRole::Hydro => "hydro",
            NodeRole::Solar => "solar",
            NodeRole::ThermalWithDemand => "thermal-with-demand",
            NodeRole::ThermalWithoutDemand => "thermal-without-demand",
            NodeRole::TransformerWithDemand => "transformer-with-demand",
            NodeRole::TransformerWithoutDemand => "transformer-without-demand",
        };
        f.write_str(label)
    }
}

impl FromStr for NodeRole {
    type Err = GridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NodeRole::ALL
            .into_iter()
            .find(|role| role.to_string() == value || role.set_name() == value)
            .ok_or_else(|| GridError::Config(format!("unknown node role '{}'", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub role: NodeRole,
}

/// Thermal limit and susceptance of one directed line entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineRating {
    /// Thermal limit (MVA)
    pub limit_mva: f64,
    pub susceptance: f64,
}

/// Validated, immutable network and fleet.
///
/// Node and generator order is the declaration order; formulations iterate
/// in this order so that rebuilding a window is deterministic.
#[derive(Debug, Clone)]
pub struct Grid {
    nodes: Vec<Node>,
    node_lookup: HashMap<NodeId, usize>,
    generators: Vec<Generator>,
    gen_lookup: HashMap<GenId, usize>,
    gens_by_node: Vec<Vec<usize>>,
    lines: BTreeMap<(usize, usize), LineRating>,
    diagnostics: Diagnostics,
}

impl Grid {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.node_lookup.get(id).copied()
    }

    pub fn demand_nodes(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.role.has_demand())
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn generator(&self, id: &GenId) -> Option<&Generator> {
        self.generator_index(id).map(|idx| &self.generators[idx])
    }

    pub fn generator_index(&self, id: &GenId) -> Option<usize> {
        self.gen_lookup.get(id).copied()
    }

    /// Generator positions owned by the node at `node_idx`.
    pub fn generators_at(&self, node_idx: usize) -> &[usize] {
        self.gens_by_node
            .get(node_idx)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn generators_of_fuel<'a>(
        &'a self,
        fuel: &'a FuelType,
    ) -> impl Iterator<Item = (usize, &'a Generator)> {
        self.generators
            .iter()
            .enumerate()
            .filter(move |(_, gen)| &gen.fuel == fuel)
    }

    /// Distinct fuel types present in the fleet, sorted.
    pub fn fuel_types(&self) -> Vec<FuelType> {
        let mut fuels: Vec<FuelType> = self.generators.iter().map(|g| g.fuel.clone()).collect();
        fuels.sort();
        fuels.dedup();
        fuels
    }

    /// Rating of the directed entry `from -> to`, by position.
    pub fn rating(&self, from: usize, to: usize) -> Option<&LineRating> {
        self.lines.get(&(from, to))
    }

    /// Thermal limit between two nodes; 0 when they are not connected.
    pub fn line_limit(&self, from: &NodeId, to: &NodeId) -> f64 {
        self.rating_by_id(from, to)
            .map(|r| r.limit_mva)
            .unwrap_or(0.0)
    }

    /// Susceptance between two nodes; 0 when they are not connected.
    pub fn susceptance(&self, from: &NodeId, to: &NodeId) -> f64 {
        self.rating_by_id(from, to)
            .map(|r| r.susceptance)
            .unwrap_or(0.0)
    }

    fn rating_by_id(&self, from: &NodeId, to: &NodeId) -> Option<&LineRating> {
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        self.rating(a, b)
    }

    /// Directed entries leaving `node_idx`, ordered by neighbour position.
    pub fn neighbours(&self, node_idx: usize) -> impl Iterator<Item = (usize, &LineRating)> {
        self.lines
            .range((node_idx, 0)..(node_idx + 1, 0))
            .map(|(&(_, to), rating)| (to, rating))
    }

    /// Every directed entry, ordered by (from, to).
    pub fn directed_lines(&self) -> impl Iterator<Item = (usize, usize, &LineRating)> {
        self.lines.iter().map(|(&(a, b), rating)| (a, b, rating))
    }

    /// Number of physical lines (each stored twice).
    pub fn line_count(&self) -> usize {
        self.lines.keys().filter(|(a, b)| a < b).count()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

/// Builder that validates the grid on [`GridBuilder::build`].
#[derive(Debug, Default)]
pub struct GridBuilder {
    nodes: Vec<Node>,
    generators: Vec<Generator>,
    lines: Vec<(NodeId, NodeId, LineRating)>,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: impl Into<NodeId>, role: NodeRole) -> Self {
        self.nodes.push(Node {
            id: id.into(),
            role,
        });
        self
    }

    pub fn generator(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    /// Add a physical line; both directions are stored.
    pub fn line(
        self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
        limit_mva: f64,
        susceptance: f64,
    ) -> Self {
        let a = a.into();
        let b = b.into();
        self.directed_line(a.clone(), b.clone(), limit_mva, susceptance)
            .directed_line(b, a, limit_mva, susceptance)
    }

    /// Add one directed entry. The reverse entry must be added as well,
    /// otherwise [`GridBuilder::build`] rejects the grid.
    pub fn directed_line(
        mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        limit_mva: f64,
        susceptance: f64,
    ) -> Self {
        self.lines.push((
            from.into(),
            to.into(),
            LineRating {
                limit_mva,
                susceptance,
            },
        ));
        self
    }

    pub fn build(self) -> GridResult<Grid> {
        let mut diagnostics = Diagnostics::new();

        let mut node_lookup = HashMap::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            if node_lookup.insert(node.id.clone(), idx).is_some() {
                return Err(GridError::integrity(
                    format!("node {}", node.id),
                    "declared more than once",
                ));
            }
        }
        if self.nodes.is_empty() {
            return Err(GridError::integrity("grid", "no nodes declared"));
        }

        let mut gen_lookup = HashMap::with_capacity(self.generators.len());
        let mut gens_by_node = vec![Vec::new(); self.nodes.len()];
        for (idx, gen) in self.generators.iter().enumerate() {
            let entity = format!("generator {}", gen.id);
            if gen_lookup.insert(gen.id.clone(), idx).is_some() {
                return Err(GridError::integrity(entity, "declared more than once"));
            }
            let node_idx = *node_lookup.get(&gen.node).ok_or_else(|| {
                GridError::integrity(&entity, format!("references unknown node {}", gen.node))
            })?;
            let role = self.nodes[node_idx].role;
            if !role.hosts_generators() {
                return Err(GridError::integrity(
                    &entity,
                    format!("node {} has role {} and cannot host generators", gen.node, role),
                ));
            }
            if let Some(problem) = gen.parameter_problems().into_iter().next() {
                return Err(GridError::integrity(entity, problem));
            }
            if gen.max_mw == 0.0 {
                diagnostics.add_warning_with_entity("fleet", "zero capacity", gen.id.as_str());
            }
            gens_by_node[node_idx].push(idx);
        }

        let mut lines = BTreeMap::new();
        for (from, to, rating) in &self.lines {
            let entity = format!("line {}-{}", from, to);
            let a = *node_lookup
                .get(from)
                .ok_or_else(|| GridError::integrity(&entity, format!("unknown node {}", from)))?;
            let b = *node_lookup
                .get(to)
                .ok_or_else(|| GridError::integrity(&entity, format!("unknown node {}", to)))?;
            if !rating.limit_mva.is_finite() || rating.limit_mva < 0.0 {
                return Err(GridError::integrity(entity, "limit must be finite and non-negative"));
            }
            if !rating.susceptance.is_finite() {
                return Err(GridError::integrity(entity, "susceptance must be finite"));
            }
            // Unconnected pairs may be listed explicitly as (0, 0).
            if rating.limit_mva == 0.0 && rating.susceptance == 0.0 {
                continue;
            }
            if a == b {
                return Err(GridError::integrity(entity, "line connects a node to itself"));
            }
            if let Some(previous) = lines.insert((a, b), *rating) {
                if previous != *rating {
                    return Err(GridError::integrity(entity, "conflicting duplicate entries"));
                }
            }
        }
        for (&(a, b), rating) in &lines {
            match lines.get(&(b, a)) {
                Some(reverse) if reverse == rating => {}
                Some(_) => {
                    return Err(GridError::integrity(
                        format!("line {}-{}", self.nodes[a].id, self.nodes[b].id),
                        "reverse entry has a different rating",
                    ))
                }
                None => {
                    return Err(GridError::integrity(
                        format!("line {}-{}", self.nodes[a].id, self.nodes[b].id),
                        "reverse entry missing",
                    ))
                }
            }
        }

        let grid = Grid {
            nodes: self.nodes,
            node_lookup,
            generators: self.generators,
            gen_lookup,
            gens_by_node,
            lines,
            diagnostics: Diagnostics::new(),
        };

        if grid.nodes.len() > 1 {
            let connected: HashSet<usize> = grid.lines.keys().map(|&(a, _)| a).collect();
            for (idx, node) in grid.nodes.iter().enumerate() {
                if !connected.contains(&idx) {
                    diagnostics.add_warning_with_entity(
                        "topology",
                        "node has no transmission line",
                        node.id.as_str(),
                    );
                }
            }
        }
        let islands = graph_utils::find_islands(&grid);
        if islands.len() > 1 {
            diagnostics.add_warning(
                "topology",
                format!(
                    "network splits into {} islands; only one holds the reference angle",
                    islands.len()
                ),
            );
        }

        Ok(Grid {
            diagnostics,
            ..grid
        })
    }
}
