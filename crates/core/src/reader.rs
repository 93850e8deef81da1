//! Snapshot reader: lazy top-down traversal of a manifest tree
//!
//! Listing and downloading share one depth-first walk that yields directories
//! and files in stored manifest order. Manifests are fetched only when the walk
//! reaches them.

use std::fs;
use std::iter::FusedIterator;
use std::path::Path;

use crate::builder::join_rel;
use crate::error::{Result, SnapError};
use crate::hash::ContentId;
use crate::manifest::{Manifest, ManifestEntry};
use crate::store::ObjectStore;

/// One node met during a traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotItem {
    Directory { id: ContentId, path: String },
    File { id: ContentId, size: u64, path: String },
}

impl SnapshotItem {
    pub fn path(&self) -> &str {
        match self {
            Self::Directory { path, .. } | Self::File { path, .. } => path,
        }
    }

    pub fn id(&self) -> &ContentId {
        match self {
            Self::Directory { id, .. } | Self::File { id, .. } => id,
        }
    }
}

struct Frame {
    path: String,
    entries: std::vec::IntoIter<ManifestEntry>,
}

/// Depth-first walk over a snapshot.
///
/// The first item is the root directory itself (at the prefix path). Ends after
/// the first error.
pub struct SnapshotWalk<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    root: Option<(ContentId, String)>,
    stack: Vec<Frame>,
    failed: bool,
}

impl<'a, S: ObjectStore + ?Sized> SnapshotWalk<'a, S> {
    pub fn new(id: &ContentId, prefix: &str, store: &'a S) -> Self {
        Self {
            store,
            root: Some((id.clone(), prefix.to_string())),
            stack: Vec::new(),
            failed: false,
        }
    }

    fn enter(&mut self, id: ContentId, path: String) -> Result<SnapshotItem> {
        let manifest = load_manifest(self.store, &id, &path)?;
        self.stack.push(Frame {
            path: path.clone(),
            entries: manifest.into_entries().into_iter(),
        });
        Ok(SnapshotItem::Directory { id, path })
    }

    fn advance(&mut self) -> Option<Result<SnapshotItem>> {
        if let Some((id, path)) = self.root.take() {
            return Some(self.enter(id, path));
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let path = join_rel(&frame.path, &entry.name);
            if entry.is_directory() {
                return Some(self.enter(entry.id, path));
            }
            return Some(Ok(SnapshotItem::File {
                id: entry.id,
                size: entry.size,
                path,
            }));
        }
    }
}

impl<S: ObjectStore + ?Sized> Iterator for SnapshotWalk<'_, S> {
    type Item = Result<SnapshotItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.advance();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
            self.stack.clear();
        }
        item
    }
}

impl<S: ObjectStore + ?Sized> FusedIterator for SnapshotWalk<'_, S> {}

/// Fetch, verify and decode one manifest
fn load_manifest<S: ObjectStore + ?Sized>(store: &S, id: &ContentId, path: &str) -> Result<Manifest> {
    fetch_verified(store, id)
        .and_then(|bytes| Manifest::decode(&bytes))
        .map_err(|e| e.locate(id, path))
}

/// Fetch an object and check that it hashes back to `id`
fn fetch_verified<S: ObjectStore + ?Sized>(store: &S, id: &ContentId) -> Result<Vec<u8>> {
    let bytes = store.get(id)?;
    id.verify(&bytes).map_err(|actual| SnapError::DigestMismatch {
        id: id.clone(),
        actual: actual.to_string(),
        path: None,
    })?;
    Ok(bytes)
}

/// A file entry as reported by [`list_snapshot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub id: ContentId,
    pub size: u64,
    pub path: String,
}

/// Iterator over every file of a snapshot
pub struct SnapshotListing<'a, S: ObjectStore + ?Sized> {
    walk: SnapshotWalk<'a, S>,
}

impl<S: ObjectStore + ?Sized> Iterator for SnapshotListing<'_, S> {
    type Item = Result<ListedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walk.next()? {
                Ok(SnapshotItem::File { id, size, path }) => {
                    return Some(Ok(ListedFile { id, size, path }))
                }
                Ok(SnapshotItem::Directory { .. }) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<S: ObjectStore + ?Sized> FusedIterator for SnapshotListing<'_, S> {}

/// Lazily list the files of snapshot `id`, paths prefixed with `prefix`
pub fn list_snapshot<'a, S>(id: &ContentId, prefix: &str, store: &'a S) -> SnapshotListing<'a, S>
where
    S: ObjectStore + ?Sized,
{
    SnapshotListing {
        walk: SnapshotWalk::new(id, prefix, store),
    }
}

/// Totals of a finished download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Recreate snapshot `id` under `destination/prefix`.
///
/// Existing files are overwritten. On error, whatever was already written
/// stays on disk.
pub fn download_snapshot<S>(
    id: &ContentId,
    prefix: &str,
    destination: &Path,
    store: &S,
) -> Result<DownloadReport>
where
    S: ObjectStore + ?Sized,
{
    let mut report = DownloadReport::default();

    for item in SnapshotWalk::new(id, prefix, store) {
        match item? {
            SnapshotItem::Directory { path, .. } => {
                let target = destination.join(&path);
                fs::create_dir_all(&target).map_err(|e| SnapError::local_io(&target, e))?;
                report.directories += 1;
            }
            SnapshotItem::File { id, size, path } => {
                tracing::info!("Downloading {} ({} bytes)", path, size);
                let data = fetch_verified(store, &id).map_err(|e| e.locate(&id, &path))?;
                if data.len() as u64 != size {
                    tracing::warn!(
                        "{} is {} bytes but its manifest records {}",
                        path,
                        data.len(),
                        size
                    );
                }

                let target = destination.join(&path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| SnapError::local_io(parent, e))?;
                }
                fs::write(&target, &data).map_err(|e| SnapError::local_io(&target, e))?;

                report.files += 1;
                report.bytes += data.len() as u64;
            }
        }
    }

    Ok(report)
}
