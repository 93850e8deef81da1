//! Show the effective configuration

use crate::config::{example_config, Config};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(current: &Config, config_path: &Path, example: bool) -> Result<()> {
    if example {
        print!("{}", example_config());
        return Ok(());
    }

    let note = if config_path.exists() {
        ""
    } else {
        " (not found, showing defaults)"
    };
    println!("# {}{}", config_path.display(), note.dimmed());

    let content = toml::to_string_pretty(current).context("Failed to serialize config")?;
    print!("{}", content);

    Ok(())
}
