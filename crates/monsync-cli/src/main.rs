//! monsync - keep local alerting monitor definitions in sync with OpenSearch
//!
//! Provides commands for:
//! - Syncing monitors between the local tree and each configured instance
//! - Showing pending changes without applying them
//! - Printing local monitor documents
//! - Managing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use monsync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod credentials;
mod output;
mod prompt;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, print::PrintCommand,
    status::StatusCommand, sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "monsync",
    version,
    about = "Sync OpenSearch alerting monitors with a local folder tree"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize monitors with every active instance
    Sync(SyncCommand),
    /// Show pending changes per monitor
    Status(StatusCommand),
    /// Print local monitor documents as JSON or YAML
    Print(PrintCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

fn init_tracing(cli: &Cli, config_path: &std::path::Path) {
    let level = match cli.verbose {
        0 => Config::load_or_default(config_path).logging.level,
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // stdout is reserved for command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    init_tracing(&cli, &config_path);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&config_path, format).await,
        Commands::Status(cmd) => cmd.execute(&config_path, format).await,
        Commands::Print(cmd) => cmd.execute(&config_path, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::Completions(cmd) => cmd.execute(),
    }
}
