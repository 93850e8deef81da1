//! Snapshot builder: post-order walk that uploads new blobs and manifests
//!
//! Each directory is reduced to a manifest of its children; the manifest is
//! uploaded under its own identifier, which becomes the child entry in the
//! parent. The root manifest's identifier names the snapshot.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Result, SnapError};
use crate::hash::{identifier_of, ContentId, HashLength};
use crate::manifest::{Manifest, ManifestEntry};
use crate::policy::UploadPolicy;
use crate::store::{ExistenceIndex, ObjectStore};

/// Everything a build needs besides the tree and the store
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// File names skipped wherever they appear (exact match)
    pub exclusions: HashSet<String>,
    pub hash_length: HashLength,
    pub policy: UploadPolicy,
}

impl BuildOptions {
    pub fn new(hash_length: HashLength, policy: UploadPolicy) -> Self {
        Self {
            exclusions: HashSet::new(),
            hash_length,
            policy,
        }
    }

    pub fn with_exclusions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Snapshot identifier (root manifest)
    pub root: ContentId,
    pub files_uploaded: usize,
    /// Files whose blob was already stored
    pub files_reused: usize,
    pub manifests_uploaded: usize,
    pub manifests_reused: usize,
    /// Excluded, empty, or special entries
    pub entries_skipped: usize,
    /// Original (uncompressed) bytes handed to the store
    pub bytes_uploaded: u64,
}

impl BuildReport {
    /// Objects the store received during this build
    pub fn objects_uploaded(&self) -> usize {
        self.files_uploaded + self.manifests_uploaded
    }
}

#[derive(Debug, Default)]
struct Counters {
    files_uploaded: usize,
    files_reused: usize,
    manifests_uploaded: usize,
    manifests_reused: usize,
    entries_skipped: usize,
    bytes_uploaded: u64,
}

/// Snapshot `root` into `store`.
///
/// The store listing is fetched once up front; anything already listed is
/// never uploaded again. Any I/O or store failure aborts the build, leaving
/// already-uploaded objects in place.
pub fn build_snapshot<S>(root: &Path, options: &BuildOptions, store: &S) -> Result<BuildReport>
where
    S: ObjectStore + ?Sized,
{
    if !root.is_dir() {
        return Err(SnapError::Configuration(format!(
            "snapshot root {} is not a directory",
            root.display()
        )));
    }

    tracing::info!("Listing objects on {} store", store.name());
    let index = ExistenceIndex::seed(store)?;
    tracing::debug!("{} objects already stored", index.len());

    let mut builder = SnapshotBuilder {
        store,
        options,
        index,
        counters: Counters::default(),
    };
    let root_id = builder.snapshot_dir(root, "")?;

    let c = builder.counters;
    Ok(BuildReport {
        root: root_id,
        files_uploaded: c.files_uploaded,
        files_reused: c.files_reused,
        manifests_uploaded: c.manifests_uploaded,
        manifests_reused: c.manifests_reused,
        entries_skipped: c.entries_skipped,
        bytes_uploaded: c.bytes_uploaded,
    })
}

struct SnapshotBuilder<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    options: &'a BuildOptions,
    index: ExistenceIndex,
    counters: Counters,
}

impl<S: ObjectStore + ?Sized> SnapshotBuilder<'_, S> {
    /// Upload every new object below `dir` and return the identifier of its manifest.
    ///
    /// `rel` is the snapshot path of `dir` ("" for the root), used for logging.
    fn snapshot_dir(&mut self, dir: &Path, rel: &str) -> Result<ContentId> {
        let mut entries = Vec::new();

        let listing = fs::read_dir(dir).map_err(|e| SnapError::local_io(dir, e))?;
        for item in listing {
            let item = item.map_err(|e| SnapError::local_io(dir, e))?;
            let path = item.path();
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(
                        "{} has a name that is not valid UTF-8 ({:?}), ignoring it",
                        path.display(),
                        raw
                    );
                    self.counters.entries_skipped += 1;
                    continue;
                }
            };
            let child_rel = join_rel(rel, &name);

            // Does not follow symlinks
            let file_type = item.file_type().map_err(|e| SnapError::local_io(&path, e))?;

            if file_type.is_dir() {
                let id = self.snapshot_dir(&path, &child_rel)?;
                entries.push(ManifestEntry::directory(name, id));
            } else if file_type.is_file() {
                if let Some(entry) = self.snapshot_file(&path, name, &child_rel)? {
                    entries.push(entry);
                }
            } else {
                tracing::warn!("{} is not a regular file or directory, ignoring it", child_rel);
                self.counters.entries_skipped += 1;
            }
        }

        let manifest = Manifest::canonical(entries);
        let encoded = manifest.encode();
        let id = identifier_of(&encoded, self.options.hash_length);

        if self.index.exists(&id) {
            self.counters.manifests_reused += 1;
            tracing::debug!("Manifest {} already stored as {}", display_rel(rel), id);
        } else {
            tracing::info!(
                "Uploading manifest {} ({} bytes) as {}",
                display_rel(rel),
                encoded.len(),
                id
            );
            self.store.put(&id, &encoded, &self.options.policy.manifest_meta())?;
            self.index.insert(id.clone());
            self.counters.manifests_uploaded += 1;
            self.counters.bytes_uploaded += encoded.len() as u64;
        }

        Ok(id)
    }

    /// Upload one regular file if needed; `None` when it is excluded or empty
    fn snapshot_file(&mut self, path: &Path, name: String, rel: &str) -> Result<Option<ManifestEntry>> {
        if self.options.exclusions.contains(&name) {
            tracing::debug!("Excluding {}", rel);
            self.counters.entries_skipped += 1;
            return Ok(None);
        }

        let len = fs::metadata(path).map_err(|e| SnapError::local_io(path, e))?.len();
        if len == 0 {
            self.counters.entries_skipped += 1;
            return Ok(None);
        }

        let data = fs::read(path).map_err(|e| SnapError::local_io(path, e))?;
        // The file may have shrunk to nothing since it was listed
        if data.is_empty() {
            self.counters.entries_skipped += 1;
            return Ok(None);
        }
        let size = data.len() as u64;
        let id = identifier_of(&data, self.options.hash_length);

        if self.index.exists(&id) {
            self.counters.files_reused += 1;
        } else {
            tracing::info!("Uploading file     {} ({} bytes) as {}", rel, size, id);
            self.store.put(&id, &data, &self.options.policy.file_meta(path))?;
            self.index.insert(id.clone());
            self.counters.files_uploaded += 1;
            self.counters.bytes_uploaded += size;
        }

        Ok(Some(ManifestEntry::file(name, id, size)))
    }
}

pub(crate) fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn display_rel(rel: &str) -> &str {
    if rel.is_empty() {
        "[root]"
    } else {
        rel
    }
}
