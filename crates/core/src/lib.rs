//! Blobsnap Core - content-addressed directory snapshots
//!
//! This crate provides the snapshot engine:
//! - Truncated SHA-256 content identifiers
//! - Canonical directory manifests (the Merkle nodes of a snapshot)
//! - An object store interface with gzip-aware local and in-memory adapters
//! - Building snapshots with deduplication, listing and downloading them

pub mod error;
pub mod hash;
pub mod manifest;
pub mod blob;
pub mod policy;
pub mod store;
pub mod builder;
pub mod reader;

// Re-export main types for convenience
pub use error::{Result, SnapError};
pub use hash::{identifier_of, ContentId, HashLength};
pub use manifest::{Manifest, ManifestEntry};
pub use blob::{Acl, BlobMeta, ContentEncoding, ObjectMetadata};
pub use policy::UploadPolicy;
pub use store::{ExistenceIndex, LocalStore, MemoryStore, ObjectStore};
pub use builder::{build_snapshot, BuildOptions, BuildReport};
pub use reader::{
    download_snapshot, list_snapshot, DownloadReport, ListedFile, SnapshotItem, SnapshotListing,
    SnapshotWalk,
};
