use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Rolling-horizon unit commitment", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a model-data file and report integrity findings
    Validate {
        /// Path to the .dat model-data file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    /// Print the network, fleet and run parameters of a model-data file
    Inspect {
        /// Path to the .dat model-data file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: InspectFormat,
        /// Also write the topology as a Graphviz DOT file
        #[arg(long, value_hint = ValueHint::FilePath)]
        dot: Option<PathBuf>,
    },
    /// Solve the rolling-horizon commitment and export the run log
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to the .dat model-data file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
    /// Output file for the run log
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
    /// Output format (json, csv)
    #[arg(long, default_value = "json")]
    pub format: String,
    /// Optional TOML file with solver and driver settings
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// MILP backend (microlp, highs)
    #[arg(long)]
    pub backend: Option<String>,
    /// Wall-clock limit per window, in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,
    /// Hours committed per window before rolling forward
    #[arg(long)]
    pub commit_hours: Option<usize>,
    /// Number of windows to solve (defaults to SimDays)
    #[arg(long)]
    pub days: Option<usize>,
    /// Start from the ini_on/ini_mwh columns instead of a cold fleet
    #[arg(long)]
    pub warm_start: bool,
    /// Re-check every solved window before committing it
    #[arg(long)]
    pub verify: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InspectFormat {
    Table,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
