use clap::Parser;
use gridcommit_cli::cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {err}");
    }

    let result = match &cli.command {
        Some(Commands::Validate { input }) => commands::validate::handle(input),
        Some(Commands::Inspect { input, format, dot }) => {
            commands::inspect::handle(input, *format, dot.as_deref())
        }
        Some(Commands::Run(args)) => commands::run::handle(args),
        None => {
            info!("No subcommand provided. Use `gridcommit --help` for more information.");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
