//! In-process object store

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use super::ObjectStore;
use crate::blob::{self, Acl, BlobMeta, ObjectMetadata};
use crate::error::{Result, SnapError};
use crate::hash::ContentId;

#[derive(Debug, Clone)]
struct MemoryObject {
    stored: Vec<u8>,
    metadata: ObjectMetadata,
}

/// Object store backed by a concurrent map.
///
/// Keeps the stored (possibly compressed) form exactly like a remote backend
/// would, and counts `put` calls so callers can observe deduplication.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ContentId, MemoryObject>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls received so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.objects.contains_key(id)
    }

    /// Metadata recorded for `id`
    pub fn metadata(&self, id: &ContentId) -> Option<ObjectMetadata> {
        self.objects.get(id).map(|object| object.metadata.clone())
    }

    /// Persisted bytes of `id`, before any decompression
    pub fn stored_bytes(&self, id: &ContentId) -> Option<Vec<u8>> {
        self.objects.get(id).map(|object| object.stored.clone())
    }

    /// Overwrite an object with raw, uncompressed bytes, bypassing `put` accounting
    pub fn insert_raw(&self, id: ContentId, data: &[u8]) -> Result<()> {
        let meta = BlobMeta {
            content_type: "application/octet-stream".into(),
            cache_control: String::new(),
            compress: false,
        };
        let (stored, metadata) = blob::pack(data, &meta, Acl::Private)?;
        self.objects.insert(id, MemoryObject { stored, metadata });
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_all(&self) -> Result<Vec<ContentId>> {
        Ok(self.objects.iter().map(|entry| entry.key().clone()).collect())
    }

    fn put(&self, id: &ContentId, data: &[u8], meta: &BlobMeta) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let (stored, metadata) = blob::pack(data, meta, Acl::Private)?;
        self.objects.insert(id.clone(), MemoryObject { stored, metadata });
        Ok(())
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>> {
        let object = self
            .objects
            .get(id)
            .map(|object| object.clone())
            .ok_or_else(|| SnapError::ObjectNotFound {
                id: id.clone(),
                path: None,
            })?;
        blob::unpack(id, &object.stored, &object.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{identifier_of, HashLength};

    fn meta(compress: bool) -> BlobMeta {
        BlobMeta {
            content_type: "text/css; charset=utf-8".into(),
            cache_control: "public,max-age=60".into(),
            compress,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryStore::new();
        let data = b"body { margin: 0 }";
        let id = identifier_of(data, HashLength::default());

        store.put(&id, data, &meta(false)).unwrap();

        assert_eq!(store.get(&id).unwrap(), data);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.list_all().unwrap(), vec![id]);
    }

    #[test]
    fn test_compressed_objects_are_transparent() {
        let store = MemoryStore::new();
        let data = b"a { color: blue } ".repeat(200);
        let id = identifier_of(&data, HashLength::default());

        store.put(&id, &data, &meta(true)).unwrap();

        let metadata = store.metadata(&id).unwrap();
        assert!(metadata.is_compressed());
        assert_eq!(metadata.cache_control, "public,max-age=60");
        assert!(store.stored_bytes(&id).unwrap().len() < data.len());
        assert_eq!(store.get(&id).unwrap(), data);
    }

    #[test]
    fn test_missing_object() {
        let store = MemoryStore::new();
        let id = identifier_of(b"absent", HashLength::default());

        assert!(matches!(store.get(&id), Err(SnapError::ObjectNotFound { .. })));
    }

    #[test]
    fn test_repeated_put_is_idempotent() {
        let store = MemoryStore::new();
        let id = identifier_of(b"same", HashLength::default());

        store.put(&id, b"same", &meta(false)).unwrap();
        store.put(&id, b"same", &meta(false)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.get(&id).unwrap(), b"same");
    }

    #[test]
    fn test_insert_raw_replaces_without_counting() {
        let store = MemoryStore::new();
        let id = identifier_of(b"original", HashLength::default());
        store.put(&id, b"original", &meta(true)).unwrap();

        store.insert_raw(id.clone(), b"tampered").unwrap();

        assert_eq!(store.put_count(), 1);
        assert_eq!(store.len(), 1);
        assert!(!store.metadata(&id).unwrap().is_compressed());
        assert_eq!(store.get(&id).unwrap(), b"tampered");
    }
}
