//! Object store interface and the adapters shipped with the engine
//!
//! The snapshot engine only talks to [`ObjectStore`]; backends differ in how
//! they persist bytes and metadata, not in the contract below.

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use dashmap::DashSet;

use crate::blob::BlobMeta;
use crate::error::Result;
use crate::hash::ContentId;

/// Content-addressed blob persistence
pub trait ObjectStore: Send + Sync {
    /// Short backend name for log lines
    fn name(&self) -> &str;

    /// Point-in-time listing of every identifier currently stored.
    ///
    /// Best effort: used to seed deduplication, never as a consistency guarantee.
    fn list_all(&self) -> Result<Vec<ContentId>>;

    /// Persist `data` under `id`, gzip-compressed when `meta.compress` is set.
    ///
    /// Putting the same content twice must be harmless.
    fn put(&self, id: &ContentId, data: &[u8], meta: &BlobMeta) -> Result<()>;

    /// Original bytes of `id`, decompressed if needed; `ObjectNotFound` when absent
    fn get(&self, id: &ContentId) -> Result<Vec<u8>>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn list_all(&self) -> Result<Vec<ContentId>> {
        (**self).list_all()
    }

    fn put(&self, id: &ContentId, data: &[u8], meta: &BlobMeta) -> Result<()> {
        (**self).put(id, data, meta)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        (**self).get(id)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn list_all(&self) -> Result<Vec<ContentId>> {
        (**self).list_all()
    }

    fn put(&self, id: &ContentId, data: &[u8], meta: &BlobMeta) -> Result<()> {
        (**self).put(id, data, meta)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        (**self).get(id)
    }
}

/// Identifiers known to be stored, scoped to a single build.
///
/// Seeded once from [`ObjectStore::list_all`] and extended with every
/// identifier uploaded during the build. Safe to share across threads.
#[derive(Debug)]
pub struct ExistenceIndex {
    known: DashSet<ContentId>,
}

impl ExistenceIndex {
    /// Fetch the store's listing
    pub fn seed<S: ObjectStore + ?Sized>(store: &S) -> Result<Self> {
        let known = DashSet::new();
        for id in store.list_all()? {
            known.insert(id);
        }
        Ok(Self { known })
    }

    pub fn exists(&self, id: &ContentId) -> bool {
        self.known.contains(id)
    }

    /// Record `id` as stored; returns false if it was already known
    pub fn insert(&self, id: ContentId) -> bool {
        self.known.insert(id)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
