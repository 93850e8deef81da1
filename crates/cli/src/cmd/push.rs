//! Snapshot the configured folder into the object store

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use blobsnap_core::build_snapshot;
use owo_colors::OwoColorize;

pub fn run(config: &Config) -> Result<()> {
    // 1. Validate everything before touching the store
    let root = config.local_root()?;
    let options = config.build_options()?;
    let store = util::open_store(config.store()?)?;

    // 2. Build and upload
    tracing::info!("Uploading {} to {} store", root.display(), store.name());
    let report = build_snapshot(&root, &options, &store)
        .with_context(|| format!("Failed to snapshot {}", root.display()))?;

    // 3. Summary
    println!(
        "{} Uploaded {} files and {} manifests ({}), reused {} objects",
        "✓".green(),
        report.files_uploaded,
        report.manifests_uploaded,
        util::format_size(report.bytes_uploaded),
        report.files_reused + report.manifests_reused,
    );
    if report.entries_skipped > 0 {
        println!("  {} entries skipped", report.entries_skipped.to_string().dimmed());
    }
    println!("Snapshot identifier is {}", report.root);

    Ok(())
}
