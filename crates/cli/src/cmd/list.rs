//! Print every file of a snapshot

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use blobsnap_core::list_snapshot;

pub fn run(config: &Config, snapshot_id: &str) -> Result<()> {
    let id = util::parse_snapshot_id(snapshot_id)?;
    let store = util::open_store(config.store()?)?;

    for file in list_snapshot(&id, "", &store) {
        let file = file.with_context(|| format!("Failed to list snapshot {}", id))?;
        println!("{}", util::format_listing_line(&file.id, file.size, &file.path));
    }

    Ok(())
}
