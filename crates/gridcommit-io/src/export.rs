//! Run-log export: pretty JSON or long-format CSV.

use anyhow::{anyhow, Context, Result};
use gridcommit_core::SimulationLog;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(anyhow!("unsupported export format '{other}' (expected json or csv)")),
        }
    }
}

/// Export trait for accumulated run logs
pub trait LogExport {
    fn to_json(&self, path: &Path) -> Result<()>;

    /// One row per generator per committed hour.
    fn to_csv(&self, path: &Path) -> Result<()>;

    /// Convert to JSON value (for streaming/stdout)
    fn to_json_value(&self) -> Result<serde_json::Value>;

    fn export(&self, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => self.to_json(path),
            ExportFormat::Csv => self.to_csv(path),
        }
    }
}

impl LogExport for SimulationLog {
    fn to_json(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("serializing run log to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing JSON to {}", path.display()))?;
        Ok(())
    }

    fn to_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating CSV file {}", path.display()))?;
        write_unit_csv(self, file)
    }

    fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("converting run log to JSON value")
    }
}

/// Write the per-generator-hour records as CSV to any writer.
pub fn write_unit_csv<W: Write>(log: &SimulationLog, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in &log.units {
        wtr.serialize(record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// Write the per-node-hour records (renewable dispatch, angles) as CSV.
pub fn write_node_csv<W: Write>(log: &SimulationLog, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in &log.nodes {
        wtr.serialize(record).context("writing CSV record")?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcommit_core::{DaySummary, GenId, NodeHour, NodeId, UnitHour};
    use tempfile::TempDir;

    fn create_test_log() -> SimulationLog {
        SimulationLog {
            units: vec![
                UnitHour {
                    day: 0,
                    hour: 1,
                    generator: GenId::new("G1"),
                    on: true,
                    start: true,
                    output_mw: 80.0,
                    spin_mw: 20.0,
                    nonspin_mw: 0.0,
                },
                UnitHour {
                    day: 0,
                    hour: 1,
                    generator: GenId::new("G2"),
                    on: false,
                    start: false,
                    output_mw: 0.0,
                    spin_mw: 0.0,
                    nonspin_mw: 50.0,
                },
            ],
            nodes: vec![NodeHour {
                day: 0,
                hour: 1,
                node: NodeId::new("N"),
                hydro_mw: 0.0,
                solar_mw: 0.0,
                angle: 0.0,
            }],
            days: vec![DaySummary {
                day: 0,
                first_hour: 1,
                last_hour: 1,
                objective: 2400.0,
                solve_seconds: 0.02,
                variables: 12,
                constraints: 30,
                units_started: 1,
            }],
        }
    }

    #[test]
    fn test_to_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.json");
        create_test_log().to_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: SimulationLog = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, create_test_log());
    }

    #[test]
    fn test_to_csv_long_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("log.csv");
        create_test_log()
            .export(&path, ExportFormat::Csv)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("day,hour,generator,on,start,output_mw,spin_mw,nonspin_mw")
        );
        assert_eq!(lines.next(), Some("0,1,G1,true,true,80.0,20.0,0.0"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_node_csv() {
        let mut buffer = Vec::new();
        write_node_csv(&create_test_log(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("day,hour,node,hydro_mw,solar_mw,angle"));
    }

    #[test]
    fn test_json_value() {
        let value = create_test_log().to_json_value().unwrap();
        assert_eq!(value["days"][0]["objective"], 2400.0);
        assert_eq!(value["units"][1]["generator"], "G2");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("parquet".parse::<ExportFormat>().is_err());
    }
}
