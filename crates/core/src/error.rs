//! Error type shared by the snapshot engine

use std::fmt;
use std::path::PathBuf;

use crate::hash::ContentId;

/// Errors surfaced while building or reading snapshots
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    /// Invalid or missing settings; raised before any store call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A string that is not a lowercase hex identifier of 1-64 digits
    #[error("invalid content identifier '{0}'")]
    InvalidIdentifier(String),

    /// Backend unreachable, misconfigured, or failed to persist an object
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("object {id} not found{}", SnapshotPath(.path))]
    ObjectNotFound {
        id: ContentId,
        path: Option<String>,
    },

    #[error("corrupt manifest{}{}: {reason}", ObjectLabel(.id), SnapshotPath(.path))]
    CorruptManifest {
        id: Option<ContentId>,
        path: Option<String>,
        reason: String,
    },

    /// Stored bytes do not hash to the identifier they are stored under
    #[error("object {id} does not match its content (hashes to {actual}){}", SnapshotPath(.path))]
    DigestMismatch {
        id: ContentId,
        actual: String,
        path: Option<String>,
    },

    #[error("local I/O error at {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptManifest {
            id: None,
            path: None,
            reason: reason.into(),
        }
    }

    /// Attach the object and snapshot path being processed when the error occurred.
    ///
    /// Only traversal errors carry a location; other variants pass through unchanged.
    pub fn locate(self, object: &ContentId, snapshot_path: &str) -> Self {
        let here = Some(snapshot_path.to_string());
        match self {
            Self::ObjectNotFound { id, path } => Self::ObjectNotFound {
                id,
                path: path.or(here),
            },
            Self::CorruptManifest { id, path, reason } => Self::CorruptManifest {
                id: id.or_else(|| Some(object.clone())),
                path: path.or(here),
                reason,
            },
            Self::DigestMismatch { id, actual, path } => Self::DigestMismatch {
                id,
                actual,
                path: path.or(here),
            },
            other => other,
        }
    }
}

/// Renders an optional snapshot path as ` at <path>`; the root is shown as `[root]`
struct SnapshotPath<'a>(&'a Option<String>);

impl fmt::Display for SnapshotPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(path) if path.is_empty() => write!(f, " at [root]"),
            Some(path) => write!(f, " at {}", path),
            None => Ok(()),
        }
    }
}

struct ObjectLabel<'a>(&'a Option<ContentId>);

impl fmt::Display for ObjectLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, " {}", id),
            None => Ok(()),
        }
    }
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, SnapError>;
