//! Reconstruct a snapshot on the local filesystem

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use blobsnap_core::download_snapshot;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(config: &Config, snapshot_id: &str, download_path: &Path) -> Result<()> {
    let id = util::parse_snapshot_id(snapshot_id)?;
    let store = util::open_store(config.store()?)?;

    let report = download_snapshot(&id, "", download_path, &store)
        .with_context(|| format!("Failed to download snapshot {}", id))?;

    println!(
        "{} Restored {} files in {} directories ({}) to {}",
        "✓".green(),
        report.files,
        report.directories,
        util::format_size(report.bytes),
        download_path.display().cyan(),
    );

    Ok(())
}
