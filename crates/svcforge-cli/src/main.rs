//! svcforge CLI - Generate and run capability-composed microservices

mod cli;
mod commands;
mod error;
mod generator;
mod selection;

use clap::Parser;
use cli::{Cli, Commands};

pub use error::{CliError, CliResult};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::New {
            name,
            selection,
            output,
            force,
            runtime_path,
        } => {
            commands::new::run(
                name.as_deref(),
                &selection,
                &output,
                force,
                runtime_path.as_deref(),
            )?;
        }

        Commands::Validate {
            name,
            selection,
            json,
        } => {
            commands::validate::run(name.as_deref(), &selection, json)?;
        }

        Commands::Capabilities { json } => {
            commands::capabilities::run(json)?;
        }

        Commands::Run {
            name,
            selection,
            simulate,
        } => {
            commands::run::run(name.as_deref(), &selection, simulate).await?;
        }
    }

    Ok(())
}
