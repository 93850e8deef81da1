//! A local directory used as a bucket
//!
//! Layout:
//! ```text
//! <bucket>/
//!   objects/<id>        stored bytes (gzip when content_encoding is set)
//!   meta/<id>.json      ObjectMetadata
//!   tmp/                in-flight writes
//! ```
//!
//! An object counts as present once its metadata file exists. A put removes
//! any previous metadata, renames the bytes into place, then writes the new
//! metadata, so an interrupted put leaves the object absent, never mismatched.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::ObjectStore;
use crate::blob::{self, Acl, BlobMeta, ObjectMetadata};
use crate::error::{Result, SnapError};
use crate::hash::ContentId;

const OBJECTS_DIR: &str = "objects";
const META_DIR: &str = "meta";
const TMP_DIR: &str = "tmp";
const META_SUFFIX: &str = ".json";

pub struct LocalStore {
    root: PathBuf,
    acl: Acl,
}

impl LocalStore {
    /// Open an existing bucket directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SnapError::StoreUnavailable(format!(
                "bucket directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self {
            root,
            acl: Acl::Private,
        })
    }

    /// Provision the bucket directory if needed, then open it
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| store_io(&root, e))?;
        Self::open(root)
    }

    /// Mark every uploaded object as publicly readable
    pub fn with_public_read(mut self, public: bool) -> Self {
        self.acl = if public { Acl::PublicRead } else { Acl::Private };
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata recorded for `id`, if the object exists
    pub fn metadata(&self, id: &ContentId) -> Result<Option<ObjectMetadata>> {
        let path = self.meta_path(id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_io(&path, e)),
        };
        let metadata = serde_json::from_slice(&raw).map_err(|e| {
            SnapError::StoreUnavailable(format!("unreadable metadata {}: {}", path.display(), e))
        })?;
        Ok(Some(metadata))
    }

    fn object_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(id.as_str())
    }

    fn meta_path(&self, id: &ContentId) -> PathBuf {
        self.root
            .join(META_DIR)
            .join(format!("{}{}", id.as_str(), META_SUFFIX))
    }
}

impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    fn list_all(&self) -> Result<Vec<ContentId>> {
        let meta_dir = self.root.join(META_DIR);
        let entries = match fs::read_dir(&meta_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_io(&meta_dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| store_io(&meta_dir, e))?;
            let name = entry.file_name();
            let parsed = name
                .to_str()
                .and_then(|n| n.strip_suffix(META_SUFFIX))
                .and_then(|stem| ContentId::parse(stem).ok());
            match parsed {
                Some(id) => ids.push(id),
                None => tracing::debug!("Ignoring foreign key {:?} in bucket", name),
            }
        }
        Ok(ids)
    }

    fn put(&self, id: &ContentId, data: &[u8], meta: &BlobMeta) -> Result<()> {
        let (stored, metadata) = blob::pack(data, meta, self.acl)?;
        let metadata_json = serde_json::to_vec_pretty(&metadata).map_err(|e| {
            SnapError::StoreUnavailable(format!("cannot serialize metadata for {}: {}", id, e))
        })?;

        let meta_path = self.meta_path(id);
        match fs::remove_file(&meta_path) {
            Ok(()) => tracing::debug!("Replacing existing object {}", id),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(store_io(&meta_path, e)),
        }

        let tmp_dir = self.root.join(TMP_DIR);
        let object_path = self.object_path(id);
        atomic_write(&tmp_dir, &object_path, &stored).map_err(|e| store_io(&object_path, e))?;
        atomic_write(&tmp_dir, &meta_path, &metadata_json).map_err(|e| store_io(&meta_path, e))?;

        Ok(())
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        let metadata = self.metadata(id)?.ok_or_else(|| SnapError::ObjectNotFound {
            id: id.clone(),
            path: None,
        })?;

        let object_path = self.object_path(id);
        let stored = match fs::read(&object_path) {
            Ok(stored) => stored,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapError::ObjectNotFound {
                    id: id.clone(),
                    path: None,
                })
            }
            Err(e) => return Err(store_io(&object_path, e)),
        };

        blob::unpack(id, &stored, &metadata)
    }
}

fn store_io(path: &Path, e: std::io::Error) -> SnapError {
    SnapError::StoreUnavailable(format!("{}: {}", path.display(), e))
}

/// Write to a temp file, fsync, then rename over `target`
fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(tmp_dir)?;
    let temp_path = tmp_dir.join(uuid::Uuid::new_v4().to_string());

    let mut temp_file = fs::File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // Best effort, some filesystems refuse to fsync directories
    if let Some(parent) = target.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
