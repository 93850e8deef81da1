//! Configuration for blobsnap
//!
//! Read from `--config <path>`, else `$BLOBSNAP_CONFIG`, else
//! `~/.config/blobsnap/config.toml` (Linux) or the platform config directory.
//! Every key is optional except `local_path` (for `push`) and `[store]`.

use anyhow::{bail, Context, Result};
use blobsnap_core::{BuildOptions, HashLength, UploadPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "BLOBSNAP_CONFIG";

/// Blobsnap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Folder to snapshot on `push`; `~` is expanded
    pub local_path: Option<String>,

    /// Exact file names skipped wherever they appear (default: [".DS_Store"])
    pub exclusions: Vec<String>,

    /// Identifier length in bits, 1..=256 (default: 80)
    pub hash_bits: u32,

    /// Extensions stored gzip-compressed
    pub gzip_extensions: Vec<String>,

    /// Cache-Control set on every uploaded object
    pub cache_control: String,

    /// Content type for extensions missing from `content_types`
    pub default_content_type: String,

    /// Extension -> content type
    pub content_types: BTreeMap<String, String>,

    /// Where objects are stored
    pub store: Option<StoreConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_path: None,
            exclusions: vec![".DS_Store".to_string()],
            hash_bits: 80,
            gzip_extensions: [".txt", ".htm", ".html", ".css", ".csv", ".js", ".json"]
                .into_iter()
                .map(String::from)
                .collect(),
            cache_control: "public,max-age=31536000".to_string(),
            default_content_type: blobsnap_core::policy::DEFAULT_CONTENT_TYPE.to_string(),
            content_types: default_content_types(),
            store: None,
        }
    }
}

/// Object store selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// A local directory acting as a bucket
    Local {
        path: String,
        /// Mark uploaded objects public-read (default: false)
        #[serde(default)]
        public: bool,
    },
}

fn default_content_types() -> BTreeMap<String, String> {
    [
        (".txt", "text/plain; charset=utf-8"),
        (".htm", "text/html; charset=utf-8"),
        (".html", "text/html; charset=utf-8"),
        (".css", "text/css; charset=utf-8"),
        (".csv", "text/csv; charset=utf-8"),
        (".js", "application/javascript; charset=utf-8"),
        (".json", "application/json; charset=utf-8"),
        (".xml", "application/xml; charset=utf-8"),
        (".bin", "application/octet-stream"),
        (".pdf", "application/pdf"),
        (".ogx", "application/ogg"),
        (".zip", "application/zip"),
        (".bmp", "image/bmp"),
        (".ico", "image/x-icon"),
        (".jpg", "image/jpeg"),
        (".jpeg", "image/jpeg"),
        (".png", "image/png"),
        (".tiff", "image/tiff"),
        (".oga", "audio/ogg"),
        (".mp4a", "audio/mp4"),
        (".wav", "audio/x-wav"),
        (".ogv", "video/ogg"),
        (".mp4", "video/mp4"),
    ]
    .into_iter()
    .map(|(ext, content_type)| (ext.to_string(), content_type.to_string()))
    .collect()
}

impl Config {
    /// Core build options; fails on an out-of-range `hash_bits`
    pub fn build_options(&self) -> Result<BuildOptions> {
        let hash_length = HashLength::from_bits(self.hash_bits).context("Invalid hash_bits")?;

        let policy = UploadPolicy::new()
            .with_content_types(&self.content_types)
            .with_default_content_type(self.default_content_type.clone())
            .with_compressed_extensions(&self.gzip_extensions)
            .with_cache_control(self.cache_control.clone());

        Ok(BuildOptions::new(hash_length, policy).with_exclusions(self.exclusions.iter().cloned()))
    }

    /// The folder to snapshot, which must be an existing directory
    pub fn local_root(&self) -> Result<PathBuf> {
        let local_path = match self.local_path.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => bail!("No local_path configured; set the folder to snapshot"),
        };

        let root = expand_tilde(local_path);
        if !root.is_dir() {
            bail!("local_path {} is not an existing directory", root.display());
        }
        Ok(root)
    }

    pub fn store(&self) -> Result<&StoreConfig> {
        self.store
            .as_ref()
            .context("No object store configured; add a [store] section")
    }
}

/// Get the default config directory path
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join(".config/blobsnap"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir().map(|c| c.join("blobsnap"))
    }
}

/// Config file location when `--config` is not given
pub fn config_file_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => config_dir().map(|d| d.join("config.toml")),
    }
}

/// Load configuration from `path`
///
/// Returns the default config if the file doesn't exist.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("Config not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;

    let config = parse(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Generate example config content for display
pub fn example_config() -> String {
    let config = Config {
        local_path: Some("~/Sites/www".to_string()),
        store: Some(StoreConfig::Local {
            path: "~/buckets/www".to_string(),
            public: false,
        }),
        ..Config::default()
    };

    let mut content = String::from("# Blobsnap Configuration\n");
    content.push_str("# Location: ~/.config/blobsnap/config.toml (or $BLOBSNAP_CONFIG)\n");
    content.push_str("#\n");
    content.push_str("# local_path is required for push; [store] is required for push, list and get.\n");
    content.push_str("# hash_bits must be between 1 and 256.\n\n");

    content.push_str(&toml::to_string_pretty(&config).unwrap_or_default());
    content
}
