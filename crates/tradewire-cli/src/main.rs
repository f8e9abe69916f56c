//! tradewire CLI
//!
//! Command-line monitor for a tradewire data server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tradewire_core::Config;

mod commands;
mod notifier;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "tradewire")]
#[command(about = "tradewire - live trading data monitor")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL (overrides config and TRADEWIRE_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config file path (overrides TRADEWIRE_CONFIG)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,

    /// Output as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - only connection status changes
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and print live updates (default)
    Watch,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    init_logging();

    let config_path = cli.config_path.clone().unwrap_or_else(Config::config_file_path);
    let mut config =
        Config::load_from_path(&config_path).context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.url = url;
    }

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => commands::watch::watch(&config, &output).await,
        Commands::Config => commands::config::show(&config, &config_path, &output),
    }
}

/// Initialize logging to stderr
///
/// Level comes from TRADEWIRE_LOG (default `info`), so stdout carries only
/// command output.
fn init_logging() {
    let level = std::env::var("TRADEWIRE_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::new(format!(
        "tradewire_core={},tradewire_cli={}",
        level, level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
