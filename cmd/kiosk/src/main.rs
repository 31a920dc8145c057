//! Kiosk CLI - replays attendance sessions against the kiosk core.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, ReplayCommand};

/// Kiosk CLI - attendance kiosk similarity index.
///
/// Configuration is stored in ~/.kiosk/config.yaml.
#[derive(Parser)]
#[command(name = "kiosk")]
#[command(about = "Attendance kiosk CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.kiosk/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay an enrollment / check-in session file
    Replay(ReplayCommand),
    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON results.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Replay(cmd) => cmd.run(&cli).await,
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
