//! Stored representation of blobs: optional gzip plus per-object metadata

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SnapError};
use crate::hash::ContentId;

/// What the uploader asks for when putting an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub content_type: String,
    pub cache_control: String,
    /// Store the bytes gzip-compressed and tag them with `content-encoding: gzip`
    pub compress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Gzip,
}

/// Object visibility recorded alongside the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
}

/// Metadata persisted next to a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub cache_control: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<ContentEncoding>,
    #[serde(default)]
    pub acl: Acl,
    /// Length before compression
    pub original_len: u64,
    /// Length as persisted
    pub stored_len: u64,
    /// Hex SHA-256 of the persisted bytes
    pub stored_sha256: String,
}

impl ObjectMetadata {
    pub fn is_compressed(&self) -> bool {
        self.content_encoding == Some(ContentEncoding::Gzip)
    }
}

/// Turn original bytes into their stored form and the metadata describing it
pub fn pack(data: &[u8], meta: &BlobMeta, acl: Acl) -> Result<(Vec<u8>, ObjectMetadata)> {
    let (stored, content_encoding) = if meta.compress {
        (gzip(data)?, Some(ContentEncoding::Gzip))
    } else {
        (data.to_vec(), None)
    };

    let metadata = ObjectMetadata {
        content_type: meta.content_type.clone(),
        cache_control: meta.cache_control.clone(),
        content_encoding,
        acl,
        original_len: data.len() as u64,
        stored_len: stored.len() as u64,
        stored_sha256: hex::encode(Sha256::digest(&stored)),
    };

    Ok((stored, metadata))
}

/// Reverse [`pack`], checking the stored bytes against their recorded checksum
pub fn unpack(id: &ContentId, stored: &[u8], metadata: &ObjectMetadata) -> Result<Vec<u8>> {
    let checksum = hex::encode(Sha256::digest(stored));
    if stored.len() as u64 != metadata.stored_len || checksum != metadata.stored_sha256 {
        return Err(SnapError::StoreUnavailable(format!(
            "stored object {} failed its checksum (expected {}, got {})",
            id, metadata.stored_sha256, checksum
        )));
    }

    if !metadata.is_compressed() {
        return Ok(stored.to_vec());
    }

    let data = gunzip(stored).map_err(|e| {
        SnapError::StoreUnavailable(format!("stored object {} is not valid gzip: {}", id, e))
    })?;
    if data.len() as u64 != metadata.original_len {
        return Err(SnapError::StoreUnavailable(format!(
            "stored object {} decompressed to {} bytes, expected {}",
            id,
            data.len(),
            metadata.original_len
        )));
    }
    Ok(data)
}

/// Gzip at the highest compression level
pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::best());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| SnapError::StoreUnavailable(format!("gzip compression failed: {}", e)))
}

pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::with_capacity(data.len() * 2);
    GzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{identifier_of, HashLength};

    fn meta(compress: bool) -> BlobMeta {
        BlobMeta {
            content_type: "text/plain; charset=utf-8".into(),
            cache_control: "public,max-age=31536000".into(),
            compress,
        }
    }

    #[test]
    fn test_pack_uncompressed_keeps_bytes() {
        let data = b"plain bytes";
        let (stored, metadata) = pack(data, &meta(false), Acl::Private).unwrap();

        assert_eq!(stored, data);
        assert_eq!(metadata.content_encoding, None);
        assert_eq!(metadata.original_len, data.len() as u64);
        assert_eq!(metadata.stored_len, data.len() as u64);
    }

    #[test]
    fn test_pack_compressed_is_gzip() {
        let data = b"hello world ".repeat(1000);
        let (stored, metadata) = pack(&data, &meta(true), Acl::PublicRead).unwrap();

        assert!(metadata.is_compressed());
        assert_eq!(metadata.acl, Acl::PublicRead);
        assert!(stored.len() < data.len());
        // gzip magic
        assert_eq!(&stored[..2], &[0x1f, 0x8b]);
        assert_eq!(metadata.original_len, data.len() as u64);
    }

    #[test]
    fn test_unpack_reverses_pack() {
        let id = identifier_of(b"x", HashLength::default());
        for compress in [false, true] {
            let data = b"some css { color: red }".repeat(50);
            let (stored, metadata) = pack(&data, &meta(compress), Acl::Private).unwrap();
            assert_eq!(unpack(&id, &stored, &metadata).unwrap(), data);
        }
    }

    #[test]
    fn test_unpack_detects_tampering() {
        let id = identifier_of(b"x", HashLength::default());
        let (mut stored, metadata) = pack(b"important", &meta(false), Acl::Private).unwrap();
        stored[0] ^= 0xff;

        assert!(matches!(
            unpack(&id, &stored, &metadata),
            Err(SnapError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_unpack_rejects_bad_gzip() {
        let id = identifier_of(b"x", HashLength::default());
        let stored = b"definitely not gzip".to_vec();
        let metadata = ObjectMetadata {
            content_type: "application/json".into(),
            cache_control: String::new(),
            content_encoding: Some(ContentEncoding::Gzip),
            acl: Acl::Private,
            original_len: 100,
            stored_len: stored.len() as u64,
            stored_sha256: hex::encode(Sha256::digest(&stored)),
        };

        assert!(unpack(&id, &stored, &metadata).is_err());
    }

    #[test]
    fn test_metadata_serialization() {
        let (_, metadata) = pack(b"abc", &meta(true), Acl::PublicRead).unwrap();
        let json = serde_json::to_string(&metadata).unwrap();

        assert!(json.contains(r#""content_encoding":"gzip""#));
        assert!(json.contains(r#""acl":"public-read""#));
        let parsed: ObjectMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_gzip_empty_input() {
        let compressed = gzip(b"").unwrap();
        assert!(gunzip(&compressed).unwrap().is_empty());
    }
}
