use anyhow::{Context, Result};
use gridcommit_io::load_model_data;
use std::path::Path;

pub fn handle(input: &Path) -> Result<()> {
    let data = load_model_data(input)
        .with_context(|| format!("validating {}", input.display()))?;
    data.params
        .validate()
        .context("run parameters in the data file")?;

    println!(
        "{}: {} nodes, {} generators, {} lines, {} hours over {} day(s)",
        input.display(),
        data.grid.nodes().len(),
        data.grid.generators().len(),
        data.grid.line_count(),
        data.series.covered_hours(),
        data.params.sim_days
    );
    print!("{}", data.diagnostics);
    Ok(())
}
