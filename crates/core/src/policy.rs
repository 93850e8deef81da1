//! Upload policy: content type, compression and cache headers per object

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::blob::BlobMeta;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const MANIFEST_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Decides the metadata attached to every uploaded object.
///
/// Extensions are keyed without their leading dot and compared case-sensitively.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    content_types: HashMap<String, String>,
    default_content_type: String,
    compress_extensions: HashSet<String>,
    cache_control: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            content_types: HashMap::new(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            compress_extensions: HashSet::new(),
            cache_control: String::new(),
        }
    }
}

impl UploadPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an extension (".html" or "html") to a content type
    pub fn with_content_type(mut self, extension: &str, content_type: impl Into<String>) -> Self {
        self.content_types
            .insert(normalize_extension(extension), content_type.into());
        self
    }

    pub fn with_content_types<I, K, V>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (extension, content_type) in types {
            self.content_types
                .insert(normalize_extension(extension.as_ref()), content_type.into());
        }
        self
    }

    pub fn with_default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    /// Store files with these extensions gzip-compressed
    pub fn with_compressed_extensions<I, K>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.compress_extensions
            .extend(extensions.into_iter().map(|e| normalize_extension(e.as_ref())));
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = cache_control.into();
        self
    }

    pub fn cache_control(&self) -> &str {
        &self.cache_control
    }

    pub fn content_type_for(&self, path: &Path) -> &str {
        extension_of(path)
            .and_then(|ext| self.content_types.get(ext))
            .map(String::as_str)
            .unwrap_or(self.default_content_type.as_str())
    }

    pub fn should_compress(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.compress_extensions.contains(ext))
    }

    /// Metadata for a file blob
    pub fn file_meta(&self, path: &Path) -> BlobMeta {
        BlobMeta {
            content_type: self.content_type_for(path).to_string(),
            cache_control: self.cache_control.clone(),
            compress: self.should_compress(path),
        }
    }

    /// Metadata for a manifest; manifests are always compressed
    pub fn manifest_meta(&self) -> BlobMeta {
        BlobMeta {
            content_type: MANIFEST_CONTENT_TYPE.to_string(),
            cache_control: self.cache_control.clone(),
            compress: true,
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.strip_prefix('.').unwrap_or(extension).to_string()
}

/// Text after the last dot of the file name.
///
/// Leading dots are not separators, so `.htaccess` and `..foo` have none.
fn extension_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.trim_start_matches('.').rsplit_once('.').map(|(_, ext)| ext)
}
