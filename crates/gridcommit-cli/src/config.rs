//! Solver and driver settings read from an optional TOML file.
//!
//! ```toml
//! backend = "microlp"
//! time_limit_seconds = 120
//! commit_hours = 24
//! reference_node = "NORTH"
//! reserve_eligible = ["gas", "slack"]
//! ```
//!
//! Run scalars (SimHours, HorizonHours, ...) always come from the data file;
//! command-line flags override anything set here.

use anyhow::{bail, Context, Result};
use gridcommit_algo::MilpBackend;
use gridcommit_core::{FuelType, NodeId, RunParameters};
use gridcommit_io::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// MILP backend name
    pub backend: Option<String>,
    /// Per-window wall-clock limit
    pub time_limit_seconds: Option<f64>,
    /// Start-indicator constant
    pub big_m: Option<f64>,
    /// Node pinned to angle zero
    pub reference_node: Option<String>,
    /// Hours kept per window
    pub commit_hours: Option<usize>,
    /// Reserve share of demand when SimReserves is absent
    pub reserve_margin: Option<f64>,
    /// Fuel types allowed to hold reserve
    pub reserve_eligible: Option<Vec<String>>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        let mut options = LoadOptions::default();
        if let Some(margin) = self.reserve_margin {
            options.reserve_margin = margin;
        }
        options
    }

    pub fn backend(&self) -> Result<MilpBackend> {
        match &self.backend {
            Some(name) => name.parse(),
            None => Ok(MilpBackend::default()),
        }
    }

    pub fn time_limit(&self) -> Result<Option<Duration>> {
        match self.time_limit_seconds {
            None => Ok(None),
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
                Ok(Some(Duration::from_secs_f64(seconds)))
            }
            Some(seconds) => bail!("time limit must be a positive number of seconds, got {seconds}"),
        }
    }

    /// Overlay driver settings onto parameters read from the data file.
    pub fn apply(&self, params: &mut RunParameters) {
        if let Some(big_m) = self.big_m {
            params.big_m = big_m;
        }
        if let Some(node) = &self.reference_node {
            params.reference_node = Some(NodeId::new(node.as_str()));
        }
        if let Some(commit) = self.commit_hours {
            params.commit_hours = commit;
        }
        if let Some(fuels) = &self.reserve_eligible {
            params.reserve_eligible = fuels
                .iter()
                .map(|name| FuelType::from(name.clone()))
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_is_default() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.backend().unwrap(), MilpBackend::Microlp);
        assert_eq!(config.time_limit().unwrap(), None);
    }

    #[test]
    fn test_load_and_apply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
backend = "microlp"
time_limit_seconds = 90
commit_hours = 12
reference_node = "SUB"
reserve_eligible = ["Gas", "hydrogen"]
reserve_margin = 0.1
"#,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.time_limit().unwrap(), Some(Duration::from_secs(90)));
        assert_eq!(config.load_options().reserve_margin, 0.1);

        let mut params = RunParameters::default();
        config.apply(&mut params);
        assert_eq!(params.commit_hours, 12);
        assert_eq!(params.reference_node, Some(NodeId::new("SUB")));
        assert_eq!(params.reserve_eligible, vec![FuelType::Gas, FuelType::Hydrogen]);
        assert_eq!(params.big_m, 1e5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = toml::from_str::<RunConfig>("solver = \"cplex\"").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_bad_values() {
        let config = RunConfig {
            backend: Some("gurobi".into()),
            time_limit_seconds: Some(-1.0),
            ..RunConfig::default()
        };
        assert!(config.backend().is_err());
        assert!(config.time_limit().is_err());
    }
}
