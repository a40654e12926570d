//! Map a parsed `.dat` file onto the grid model.
//!
//! Loading is all-or-nothing: any inconsistency between the declared sets
//! and the tables aborts with [`GridError::DataIntegrity`] (or
//! [`GridError::Parse`] for malformed rows), and nothing partial is
//! returned. Non-fatal findings are collected in [`ModelData::diagnostics`].

use crate::dat::{parse_dat, DatFile, DatRow, ParamBlock};
use gridcommit_core::timeseries::DEFAULT_RESERVE_MARGIN;
use gridcommit_core::{
    Diagnostics, FuelType, GenId, Generator, Grid, GridBuilder, GridError, GridResult,
    HourlySeries, NodeId, NodeRole, RunParameters, TimeSeries, TimeSeriesBuilder, UnitState,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

const GENERATOR_COLUMNS: [&str; 12] = [
    "typ",
    "node",
    "maxcap",
    "mincap",
    "heat_rate",
    "var_om",
    "fix_om",
    "st_cost",
    "ramp",
    "minup",
    "mindn",
    "gen_cost",
];

/// Sets that describe nodes rather than fuel types.
const NODE_SETS: [&str; 4] = ["nodes", "sources", "sinks", "d_nodes"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Share of total demand used when the file has no `SimReserves` table
    pub reserve_margin: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            reserve_margin: DEFAULT_RESERVE_MARGIN,
        }
    }
}

/// Everything a run needs, loaded from one model-data file.
#[derive(Debug, Clone)]
pub struct ModelData {
    pub grid: Grid,
    pub series: TimeSeries,
    pub params: RunParameters,
    pub diagnostics: Diagnostics,
}

pub fn load_model_data(path: &Path) -> GridResult<ModelData> {
    load_model_data_with(path, &LoadOptions::default())
}

pub fn load_model_data_with(path: &Path, options: &LoadOptions) -> GridResult<ModelData> {
    let content = fs::read_to_string(path)?;
    let data = model_data_from_str(&content, options)?;
    tracing::info!(
        path = %path.display(),
        nodes = data.grid.nodes().len(),
        generators = data.grid.generators().len(),
        lines = data.grid.line_count(),
        hours = data.params.sim_hours,
        "loaded model data"
    );
    Ok(data)
}

pub fn model_data_from_str(content: &str, options: &LoadOptions) -> GridResult<ModelData> {
    let dat = parse_dat(content)?;
    let mut diagnostics = Diagnostics::new();

    let nodes = read_nodes(&dat)?;
    let generators = read_generators(&dat)?;
    check_generator_sets(&dat, &nodes, &generators, &mut diagnostics)?;
    let lines = read_lines(&dat, &mut diagnostics)?;

    let mut builder = GridBuilder::new();
    for (id, role) in &nodes {
        builder = builder.node(id.clone(), *role);
    }
    for gen in generators {
        builder = builder.generator(gen);
    }
    for ((from, to), (mva, sus)) in lines {
        builder = builder.directed_line(from, to, mva, sus);
    }
    let grid = builder.build()?;
    diagnostics.merge(grid.diagnostics().clone());

    let params = read_params(&dat)?;
    let series = read_series(&dat, params.sim_hours, options)?;
    series.validate_against(&grid)?;
    series.check_hours(params.sim_hours)?;

    Ok(ModelData {
        grid,
        series,
        params,
        diagnostics,
    })
}

/// Node ids in declaration order with their single role.
fn read_nodes(dat: &DatFile) -> GridResult<Vec<(NodeId, NodeRole)>> {
    let mut role_of: HashMap<&str, NodeRole> = HashMap::new();
    let mut role_order = Vec::new();
    for role in NodeRole::ALL {
        let Some(set) = dat.set(role.set_name()) else {
            continue;
        };
        for item in &set.items {
            if let Some(previous) = role_of.insert(item.as_str(), role) {
                return Err(GridError::integrity(
                    format!("node {}", item),
                    format!(
                        "appears in both {} and {}",
                        previous.set_name(),
                        role.set_name()
                    ),
                ));
            }
            role_order.push(item.as_str());
        }
    }

    let order: Vec<&str> = match dat.set("nodes") {
        Some(all) => {
            let declared: BTreeSet<&str> = all.items.iter().map(String::as_str).collect();
            if declared.len() != all.items.len() {
                return Err(GridError::integrity("set nodes", "duplicate node id"));
            }
            for item in &all.items {
                if !role_of.contains_key(item.as_str()) {
                    return Err(GridError::integrity(
                        format!("node {}", item),
                        "appears in no role set",
                    ));
                }
            }
            if let Some(extra) = role_order.iter().find(|id| !declared.contains(*id)) {
                return Err(GridError::integrity(
                    format!("node {}", extra),
                    "has a role but is missing from set nodes",
                ));
            }
            all.items.iter().map(String::as_str).collect()
        }
        None => role_order,
    };

    let known: BTreeSet<&str> = order.iter().copied().collect();
    for name in ["sources", "sinks"] {
        if let Some(set) = dat.set(name) {
            if let Some(unknown) = set.items.iter().find(|i| !known.contains(i.as_str())) {
                return Err(GridError::integrity(
                    format!("set {}", name),
                    format!("unknown node {}", unknown),
                ));
            }
        }
    }
    if let Some(d_nodes) = dat.set("d_nodes") {
        let declared: BTreeSet<&str> = d_nodes.items.iter().map(String::as_str).collect();
        let expected: BTreeSet<&str> = role_of
            .iter()
            .filter(|(_, role)| role.has_demand())
            .map(|(id, _)| *id)
            .collect();
        if declared != expected {
            return Err(GridError::integrity(
                "set d_nodes",
                "must equal gd_nodes and td_nodes combined",
            ));
        }
    }

    Ok(order
        .into_iter()
        .map(|id| (NodeId::new(id), role_of[id]))
        .collect())
}

fn read_generators(dat: &DatFile) -> GridResult<Vec<Generator>> {
    let block = dat
        .block_with("maxcap")
        .ok_or_else(|| GridError::integrity("generator table", "no block with a maxcap column"))?;
    let mut col = HashMap::new();
    for name in GENERATOR_COLUMNS {
        let idx = block.column_index(name).ok_or_else(|| {
            GridError::parse(block.line, format!("generator table has no {} column", name))
        })?;
        col.insert(name, idx);
    }
    let ini_on = block.column_index("ini_on");
    let ini_mwh = block.column_index("ini_mwh");

    let mut generators = Vec::with_capacity(block.rows.len());
    for row in &block.rows {
        let [id] = row.keys.as_slice() else {
            return Err(GridError::parse(
                row.line,
                "generator rows need exactly one id before the values",
            ));
        };
        let num = |name: &str| row.number(col[name], name);
        let fuel: FuelType = row.values[col["typ"]].clone().into();
        let mut gen = Generator::new(id.as_str(), row.values[col["node"]].as_str(), fuel)
            .with_capacity(num("mincap")?, num("maxcap")?)
            .with_costs(
                num("heat_rate")?,
                num("gen_cost")?,
                num("var_om")?,
                num("fix_om")?,
                num("st_cost")?,
            )
            .with_ramp(num("ramp")?)
            .with_min_up_down(
                whole_hours(row, col["minup"], "minup")?,
                whole_hours(row, col["mindn"], "mindn")?,
            );
        if let (Some(on_idx), Some(mwh_idx)) = (ini_on, ini_mwh) {
            let on = row.number(on_idx, "ini_on")?;
            let output = row.number(mwh_idx, "ini_mwh")?;
            gen = gen.with_warm_start(UnitState::new(on > 0.5, output));
        }
        generators.push(gen);
    }
    Ok(generators)
}

fn whole_hours(row: &DatRow, idx: usize, column: &str) -> GridResult<u32> {
    let value = row.number(idx, column)?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(GridError::parse(
            row.line,
            format!("{} must be a whole number of hours, got {}", column, value),
        ));
    }
    Ok(value as u32)
}

/// `GD<n>Gens`/`GN<n>Gens` and fuel-type sets must agree with the table.
fn check_generator_sets(
    dat: &DatFile,
    nodes: &[(NodeId, NodeRole)],
    generators: &[Generator],
    diagnostics: &mut Diagnostics,
) -> GridResult<()> {
    let mut node_sets = 0;
    for set in &dat.sets {
        if NODE_SETS.contains(&set.name.as_str()) || NodeRole::from_set_name(&set.name).is_some()
        {
            continue;
        }
        let declared: BTreeSet<&str> = set.items.iter().map(String::as_str).collect();
        let entity = format!("set {}", set.name);

        let expected: BTreeSet<&str> = if let Some((role, n)) = node_set_target(&set.name) {
            let members: Vec<&NodeId> = nodes
                .iter()
                .filter(|(_, r)| *r == role)
                .map(|(id, _)| id)
                .collect();
            let node = n
                .checked_sub(1)
                .and_then(|i| members.get(i))
                .ok_or_else(|| {
                    GridError::integrity(&entity, format!("{} has no node {}", role.set_name(), n))
                })?;
            node_sets += 1;
            generators
                .iter()
                .filter(|g| &g.node == *node)
                .map(|g| g.id.as_str())
                .collect()
        } else {
            let fuel = FuelType::from(set.name.clone());
            generators
                .iter()
                .filter(|g| g.fuel == fuel)
                .map(|g| g.id.as_str())
                .collect()
        };

        if declared != expected {
            let mut detail = Vec::new();
            if let Some(extra) = declared.difference(&expected).next() {
                detail.push(format!("{} is listed but does not belong", extra));
            }
            if let Some(missing) = expected.difference(&declared).next() {
                detail.push(format!("{} belongs but is not listed", missing));
            }
            return Err(GridError::integrity(entity, detail.join("; ")));
        }
    }
    if node_sets == 0 && !generators.is_empty() {
        diagnostics.add_info("fleet", "no GD/GN generator sets declared");
    }
    Ok(())
}

/// `GD3Gens` -> (thermal-with-demand, 3)
fn node_set_target(name: &str) -> Option<(NodeRole, usize)> {
    let middle = name.strip_suffix("Gens")?;
    let (role, digits) = if let Some(rest) = middle.strip_prefix("GD") {
        (NodeRole::ThermalWithDemand, rest)
    } else if let Some(rest) = middle.strip_prefix("GN") {
        (NodeRole::ThermalWithoutDemand, rest)
    } else {
        return None;
    };
    digits.parse().ok().map(|n| (role, n))
}

/// Directed line entries, with one-sided entries mirrored.
fn read_lines(
    dat: &DatFile,
    diagnostics: &mut Diagnostics,
) -> GridResult<BTreeMap<(String, String), (f64, f64)>> {
    let mut entries = BTreeMap::new();
    let Some(block) = dat.block_with("linemva") else {
        diagnostics.add_warning("topology", "no line table");
        return Ok(entries);
    };
    let mva_idx = block.column_index("linemva").unwrap_or(0);
    let sus_idx = block
        .column_index("linesus")
        .ok_or_else(|| GridError::parse(block.line, "line table has no linesus column"))?;

    for row in &block.rows {
        let [from, to] = row.keys.as_slice() else {
            return Err(GridError::parse(row.line, "line rows need a source and a sink"));
        };
        let mva = row.number(mva_idx, "linemva")?;
        let sus = row.number(sus_idx, "linesus")?;
        if mva == 0.0 && sus == 0.0 {
            continue;
        }
        entries.insert((from.clone(), to.clone()), (mva, sus));
    }

    let one_sided: Vec<_> = entries
        .iter()
        .filter(|((a, b), _)| !entries.contains_key(&(b.clone(), a.clone())))
        .map(|((a, b), rating)| ((b.clone(), a.clone()), *rating))
        .collect();
    if !one_sided.is_empty() {
        diagnostics.add_info(
            "topology",
            format!("mirrored {} one-directional line entries", one_sided.len()),
        );
    }
    entries.extend(one_sided);
    Ok(entries)
}

fn read_params(dat: &DatFile) -> GridResult<RunParameters> {
    let defaults = RunParameters::default();
    let count = |name: &str| -> GridResult<usize> {
        let (raw, line) = dat
            .scalar(name)
            .ok_or_else(|| GridError::integrity(format!("param {}", name), "missing"))?;
        raw.parse::<usize>().map_err(|_| {
            GridError::parse(line, format!("{} must be a whole number, got '{}'", name, raw))
        })
    };
    let real = |name: &str, default: f64| -> GridResult<f64> {
        match dat.scalar(name) {
            Some((raw, line)) => raw
                .parse::<f64>()
                .map_err(|_| GridError::parse(line, format!("{} must be a number, got '{}'", name, raw))),
            None => Ok(default),
        }
    };

    let params = RunParameters {
        sim_hours: count("SimHours")?,
        sim_days: count("SimDays")?,
        horizon_hours: count("HorizonHours")?,
        trans_loss: real("TransLoss", defaults.trans_loss)?,
        n1_criterion: real("n1criterion", defaults.n1_criterion)?,
        spin_margin: real("spin_margin", defaults.spin_margin)?,
        ..defaults
    };
    if params.horizon_hours < params.commit_hours {
        // Short horizons commit the whole window.
        return Ok(RunParameters {
            commit_hours: params.horizon_hours,
            ..params
        });
    }
    Ok(params)
}

fn read_series(dat: &DatFile, sim_hours: usize, options: &LoadOptions) -> GridResult<TimeSeries> {
    let mut builder = TimeSeriesBuilder::new().reserve_margin(options.reserve_margin);

    for (node, values) in keyed_series(dat, "SimDemand")? {
        builder = builder.demand(node, values.values().to_vec());
    }
    for (node, values) in keyed_series(dat, "SimHydro")? {
        builder = builder.hydro(node, values.values().to_vec());
    }
    for (node, values) in keyed_series(dat, "SimSolar")? {
        builder = builder.solar(node, values.values().to_vec());
    }
    for (gen, values) in keyed_series(dat, "SimDeratef")? {
        builder = builder.derate(GenId::new(gen), values.values().to_vec());
    }
    if let Some(block) = dat.block_with("SimReserves") {
        let mut pairs = Vec::with_capacity(block.rows.len());
        for row in &block.rows {
            let [hour] = row.keys.as_slice() else {
                return Err(GridError::parse(row.line, "SimReserves rows are 'hour value'"));
            };
            pairs.push((parse_hour(row, hour)?, row.number(0, "SimReserves")?));
        }
        let series = HourlySeries::from_hour_values(pairs)
            .map_err(|msg| GridError::integrity("SimReserves", msg))?;
        builder = builder.reserves(series.values().to_vec());
    } else if dat.block_with("SimDemand").is_none() {
        // Nothing to derive a requirement from.
        builder = builder.reserves(vec![0.0; sim_hours]);
    }
    Ok(builder.build())
}

/// Rows `id hour value` of a one-column table, grouped by id.
fn keyed_series(dat: &DatFile, column: &str) -> GridResult<BTreeMap<String, HourlySeries>> {
    let Some(block) = dat.block_with(column) else {
        return Ok(BTreeMap::new());
    };
    let idx = value_column(block, column);
    let mut grouped: BTreeMap<String, Vec<(usize, f64)>> = BTreeMap::new();
    for row in &block.rows {
        let [id, hour] = row.keys.as_slice() else {
            return Err(GridError::parse(
                row.line,
                format!("{} rows are 'id hour value'", column),
            ));
        };
        grouped
            .entry(id.clone())
            .or_default()
            .push((parse_hour(row, hour)?, row.number(idx, column)?));
    }
    grouped
        .into_iter()
        .map(|(id, pairs)| {
            HourlySeries::from_hour_values(pairs)
                .map(|series| (id.clone(), series))
                .map_err(|msg| GridError::integrity(format!("{} {}", column, id), msg))
        })
        .collect()
}

fn value_column(block: &ParamBlock, column: &str) -> usize {
    block.column_index(column).unwrap_or(0)
}

fn parse_hour(row: &DatRow, raw: &str) -> GridResult<usize> {
    raw.parse::<usize>()
        .map_err(|_| GridError::parse(row.line, format!("hour '{}' is not a whole number", raw)))
}
