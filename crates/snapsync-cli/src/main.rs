//! snapsync CLI - Run background sync workers and inspect their failures.

mod commands;
mod drill;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "snapsync")]
#[command(author, version, about = "Background snapshot sync workers")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Config file path
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "SNAPSYNC_CONFIG",
        default_value = snapsync_worker::config::CONFIG_FILE
    )]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured workers until they all stop
    Run {
        /// Do not start the status API
        #[arg(long)]
        no_status: bool,
    },

    /// Validate the config file
    Check,

    /// List every error code
    Codes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if cli.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    match cli.command {
        Commands::Run { no_status } => commands::run(&cli.config, no_status, cli.format),
        Commands::Check => commands::check(&cli.config, cli.format),
        Commands::Codes => {
            commands::codes(cli.format);
            Ok(())
        }
    }
}
