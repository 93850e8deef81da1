//! Blobsnap CLI - blobsnap command

use anyhow::{Context, Result};
use blobsnap_cli::{cmd, config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Blobsnap - Content-addressed snapshots of a folder in an object store
#[derive(Parser)]
#[command(name = "blobsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $BLOBSNAP_CONFIG, then ~/.config/blobsnap/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot the configured local folder and upload new objects
    Push,
    /// List every file of a snapshot
    List {
        /// Snapshot identifier (root manifest)
        snapshot_id: String,
    },
    /// Download a snapshot into a folder
    Get {
        /// Snapshot identifier (root manifest)
        snapshot_id: String,
        /// Folder to write the snapshot into
        download_path: PathBuf,
    },
    /// Show the effective configuration
    Config {
        /// Print a commented example config instead
        #[arg(long)]
        example: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_file_path().context("Could not determine config directory")?,
    };
    let config = config::load(&config_path)?;

    match cli.command {
        Commands::Push => cmd::push::run(&config),
        Commands::List { snapshot_id } => cmd::list::run(&config, &snapshot_id),
        Commands::Get { snapshot_id, download_path } => {
            cmd::get::run(&config, &snapshot_id, &download_path)
        }
        Commands::Config { example } => cmd::config::run(&config, &config_path, example),
    }
}
