use crate::Grid;
use anyhow::{anyhow, Result};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Summary statistics printed by `inspect` (density/degree/connected components).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub line_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Undirected view of the grid: one edge per physical line, weighted by its limit.
pub fn topology(grid: &Grid) -> UnGraph<usize, f64> {
    let mut graph = UnGraph::with_capacity(grid.nodes().len(), grid.line_count());
    let indices: Vec<NodeIndex> = (0..grid.nodes().len()).map(|i| graph.add_node(i)).collect();
    for (from, to, rating) in grid.directed_lines() {
        if from < to {
            graph.add_edge(indices[from], indices[to], rating.limit_mva);
        }
    }
    graph
}

pub fn graph_stats(grid: &Grid) -> GraphStats {
    let graph = topology(grid);
    let node_count = graph.node_count();
    let line_count = graph.edge_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors(node).count())
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * line_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    GraphStats {
        node_count,
        line_count,
        connected_components: connected_components(&graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Connected components (breadth-first search), as node positions.
///
/// Islands are ordered by their lowest node position, and members are sorted,
/// so the first island always contains node 0.
pub fn find_islands(grid: &Grid) -> Vec<Vec<usize>> {
    let graph = topology(grid);
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(graph[node]);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        members.sort_unstable();
        islands.push(members);
    }
    islands
}

/// Export the topology to a DOT string (Graphviz).
pub fn export_graph(grid: &Grid, format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(grid)),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(grid: &Grid) -> String {
    let graph = topology(grid);
    let mut buffer = String::new();
    buffer.push_str("graph gridcommit {\n");
    for node in graph.node_indices() {
        let info = &grid.nodes()[graph[node]];
        let label = sanitize_label(info.id.as_str());
        buffer.push_str(&format!(
            "  n{} [label=\"{}\", role=\"{}\"];\n",
            node.index(),
            label,
            info.role
        ));
    }
    for edge in graph.edge_references() {
        let source = edge.source().index();
        let target = edge.target().index();
        buffer.push_str(&format!(
            "  n{source} -- n{target} [label=\"{:.0}\"];\n",
            edge.weight()
        ));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}
