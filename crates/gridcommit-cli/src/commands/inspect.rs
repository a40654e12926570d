//! Network, fleet and parameter listing for a model-data file.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gridcommit_cli::cli::InspectFormat;
use gridcommit_core::graph_utils::{export_graph, graph_stats, GraphStats};
use gridcommit_core::{Generator, Grid, Node, RunParameters};
use gridcommit_io::load_model_data;
use serde::Serialize;
use tabwriter::TabWriter;

pub fn handle(input: &Path, format: InspectFormat, dot: Option<&Path>) -> Result<()> {
    let data = load_model_data(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let stats = graph_stats(&data.grid);

    match format {
        InspectFormat::Table => print_tables(&data.grid, &data.params, &stats)?,
        InspectFormat::Json => print_json(&data.grid, &data.params, &stats)?,
    }

    if let Some(path) = dot {
        let rendered = export_graph(&data.grid, "dot")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("writing DOT file {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote topology");
    }
    Ok(())
}

fn print_tables(grid: &Grid, params: &RunParameters, stats: &GraphStats) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());

    writeln!(writer, "NODE\tROLE\tGENERATORS\tLINES")?;
    for (idx, node) in grid.nodes().iter().enumerate() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            node.id,
            node.role,
            grid.generators_at(idx).len(),
            grid.neighbours(idx).count()
        )?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "GENERATOR\tNODE\tFUEL\tMIN MW\tMAX MW\tMARGINAL\tRAMP\tMIN UP\tMIN DOWN"
    )?;
    for gen in grid.generators() {
        let ramp = if gen.has_ramp_limit() {
            format!("{:.1}", gen.ramp_mw_per_h)
        } else {
            "-".to_string()
        };
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.1}\t{:.1}\t{:.2}\t{}\t{}\t{}",
            gen.id,
            gen.node,
            gen.fuel,
            gen.min_mw,
            gen.max_mw,
            gen.marginal_cost(),
            ramp,
            gen.min_up_h,
            gen.min_down_h
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "FROM\tTO\tLIMIT MVA\tSUSCEPTANCE")?;
    for (from, to, rating) in grid.directed_lines().filter(|(a, b, _)| a < b) {
        writeln!(
            writer,
            "{}\t{}\t{:.1}\t{:.3}",
            grid.nodes()[from].id,
            grid.nodes()[to].id,
            rating.limit_mva,
            rating.susceptance
        )?;
    }
    writer.flush()?;

    println!();
    println!(
        "Run: {} day(s), horizon {} h, commit {} h, loss {:.3}, n1 {:.3}, spin share {:.2}",
        params.sim_days,
        params.horizon_hours,
        params.commit_hours,
        params.trans_loss,
        params.n1_criterion,
        params.spin_margin
    );
    let fuels: Vec<String> = grid.fuel_types().iter().map(|f| f.to_string()).collect();
    println!(
        "Fleet: {} generator(s), fuels {}",
        grid.generators().len(),
        fuels.join(", ")
    );
    println!(
        "Topology: {} nodes, {} lines, {} component(s), degree {}/{:.2}/{}, density {:.4}",
        stats.node_count,
        stats.line_count,
        stats.connected_components,
        stats.min_degree,
        stats.avg_degree,
        stats.max_degree,
        stats.density
    );
    Ok(())
}

#[derive(Serialize)]
struct InspectReport<'a> {
    nodes: &'a [Node],
    generators: &'a [Generator],
    lines: Vec<LineEntry<'a>>,
    params: &'a RunParameters,
    topology: &'a GraphStats,
}

#[derive(Serialize)]
struct LineEntry<'a> {
    from: &'a str,
    to: &'a str,
    limit_mva: f64,
    susceptance: f64,
}

fn print_json(grid: &Grid, params: &RunParameters, stats: &GraphStats) -> Result<()> {
    let lines = grid
        .directed_lines()
        .filter(|(a, b, _)| a < b)
        .map(|(a, b, rating)| LineEntry {
            from: grid.nodes()[a].id.as_str(),
            to: grid.nodes()[b].id.as_str(),
            limit_mva: rating.limit_mva,
            susceptance: rating.susceptance,
        })
        .collect();
    let report = InspectReport {
        nodes: grid.nodes(),
        generators: grid.generators(),
        lines,
        params,
        topology: stats,
    };
    serde_json::to_writer_pretty(io::stdout(), &report).context("serializing inspect report")?;
    println!();
    Ok(())
}
