//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use blobsnap_core::{ContentId, LocalStore, ObjectStore};

use crate::config::{expand_tilde, StoreConfig};

/// Open the configured object store
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ObjectStore>> {
    match config {
        StoreConfig::Local { path, public } => {
            let root = expand_tilde(path);
            let store = LocalStore::open(&root)
                .with_context(|| format!("Failed to open bucket at {}", root.display()))?
                .with_public_read(*public);
            Ok(Box::new(store))
        }
    }
}

/// Parse a snapshot identifier given on the command line
pub fn parse_snapshot_id(snapshot_id: &str) -> Result<ContentId> {
    ContentId::parse(snapshot_id.trim())
        .with_context(|| format!("'{}' is not a snapshot identifier", snapshot_id))
}

/// Format byte size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// One line of `list` output: identifier, size right-aligned to 10, path
pub fn format_listing_line(id: &ContentId, size: u64, path: &str) -> String {
    format!("{} {:>10}  {}", id, size, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_listing_line() {
        let id = ContentId::parse("0123456789abcdef0123").unwrap();
        assert_eq!(
            format_listing_line(&id, 312, "docs/index.html"),
            "0123456789abcdef0123        312  docs/index.html"
        );
    }

    #[test]
    fn test_parse_snapshot_id() {
        assert!(parse_snapshot_id("abc123").is_ok());
        assert!(parse_snapshot_id("ABC123").is_err());
        assert!(parse_snapshot_id("not-hex").is_err());
        assert!(parse_snapshot_id("").is_err());
    }

    #[test]
    fn test_missing_bucket_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Local {
            path: temp_dir.path().join("nope").display().to_string(),
            public: false,
        };
        assert!(open_store(&config).is_err());
    }
}
