//! Directory manifests: the Merkle nodes of a snapshot
//!
//! A manifest lists the immediate children of one directory as
//! `name -> [identifier, size]`. A size of 0 marks a nested manifest
//! (subdirectory); any other size is the byte length of a stored file.
//!
//! Encoded form (entries ascending by `(size, name)`):
//!
//! ```text
//! {"img": ["e3b0c44298fc1c149afb", 0], "index.html": ["9f86d081884c7d659a2f", 312]}
//! ```
//!
//! The separators and the `\uXXXX` escaping of non-ASCII characters are fixed,
//! since the encoded bytes are what the manifest identifier is computed from.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{Result, SnapError};
use crate::hash::{identifier_of, ContentId, HashLength};

/// One child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub id: ContentId,
    /// Byte length of a file, or 0 for a subdirectory
    pub size: u64,
}

impl ManifestEntry {
    pub fn file(name: impl Into<String>, id: ContentId, size: u64) -> Self {
        Self {
            name: name.into(),
            id,
            size,
        }
    }

    pub fn directory(name: impl Into<String>, id: ContentId) -> Self {
        Self {
            name: name.into(),
            id,
            size: 0,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.size == 0
    }

    fn sort_key(&self) -> (u64, &str) {
        (self.size, &self.name)
    }
}

/// The entries of one directory, in encoding order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest in canonical `(size, name)` order, whatever the input order
    pub fn canonical(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the entries are in canonical order (decoded manifests keep stored order)
    #[cfg(test)]
    fn is_canonical(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].sort_key() <= pair[1].sort_key())
    }

    /// Serialize in the current entry order
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::with_capacity(2 + self.entries.len() * 48);
        out.push('{');
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_json_string(&mut out, &entry.name);
            out.push_str(": [");
            write_json_string(&mut out, entry.id.as_str());
            // Writing to a String cannot fail
            let _ = write!(out, ", {}]", entry.size);
        }
        out.push('}');
        out.into_bytes()
    }

    /// Parse an encoded manifest, keeping the stored entry order
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw: RawManifest = serde_json::from_slice(bytes)
            .map_err(|e| SnapError::corrupt(format!("not a manifest object: {}", e)))?;

        let mut seen = HashSet::with_capacity(raw.0.len());
        let mut entries = Vec::with_capacity(raw.0.len());
        for (name, (id, size)) in raw.0 {
            validate_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(SnapError::corrupt(format!("duplicate entry '{}'", name)));
            }
            let id = ContentId::parse(&id).map_err(|_| {
                SnapError::corrupt(format!("entry '{}' has invalid identifier '{}'", name, id))
            })?;
            entries.push(ManifestEntry { name, id, size });
        }

        Ok(Self { entries })
    }

    /// Encode and hash in one step
    pub fn identifier(&self, length: HashLength) -> ContentId {
        identifier_of(&self.encode(), length)
    }
}

/// Check that a name is a single, non-traversing path component
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(SnapError::corrupt(format!(
            "entry name {:?} is not a single path component",
            name
        )));
    }
    Ok(())
}

/// Quote `s` as a JSON string with every character outside printable ASCII escaped
fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

/// Flat JSON object decoded in document order
struct RawManifest(Vec<(String, (String, u64))>);

impl<'de> Deserialize<'de> for RawManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawManifest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of name -> [identifier, size]")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, (String, u64)>()? {
                    entries.push(entry);
                }
                Ok(RawManifest(entries))
            }
        }

        deserializer.deserialize_map(RawVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ContentId {
        ContentId::parse(s).unwrap()
    }

    #[test]
    fn test_canonical_order_is_size_then_name() {
        let manifest = Manifest::canonical(vec![
            ManifestEntry::file("b.txt", id("02"), 5),
            ManifestEntry::directory("sub", id("03")),
            ManifestEntry::file("a.txt", id("01"), 10),
            ManifestEntry::file("c.txt", id("04"), 5),
        ]);

        let names: Vec<_> = manifest.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub", "b.txt", "c.txt", "a.txt"]);
        assert!(manifest.is_canonical());
    }

    #[test]
    fn test_encode_layout() {
        let manifest = Manifest::canonical(vec![
            ManifestEntry::file("y.txt", id("bb"), 5),
            ManifestEntry::file("x.txt", id("aa"), 5),
            ManifestEntry::directory("css", id("cc")),
        ]);

        assert_eq!(
            String::from_utf8(manifest.encode()).unwrap(),
            r#"{"css": ["cc", 0], "x.txt": ["aa", 5], "y.txt": ["bb", 5]}"#
        );
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::canonical(Vec::new());
        assert_eq!(manifest.encode(), b"{}");
        assert!(Manifest::decode(b"{}").unwrap().is_empty());
        // sha256("{}")
        assert_eq!(
            manifest.identifier(HashLength::FULL).as_str(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_encode_escapes_non_ascii_and_controls() {
        let manifest = Manifest::canonical(vec![
            ManifestEntry::file("caf\u{e9} \"q\"\\\t.txt", id("01"), 1),
            ManifestEntry::file("\u{1f600}\u{7f}", id("02"), 2),
        ]);

        assert_eq!(
            String::from_utf8(manifest.encode()).unwrap(),
            r#"{"caf\u00e9 \"q\"\\\t.txt": ["01", 1], "\ud83d\ude00\u007f": ["02", 2]}"#
        );
    }

    #[test]
    fn test_decode_preserves_stored_order() {
        let bytes = br#"{"z": ["0f", 9], "a": ["0e", 1]}"#;
        let manifest = Manifest::decode(bytes).unwrap();

        assert_eq!(manifest.entries()[0].name, "z");
        assert_eq!(manifest.entries()[1].size, 1);
        assert!(!manifest.is_canonical());
        assert_eq!(manifest.encode(), bytes.to_vec());
    }

    #[test]
    fn test_decode_reverses_encode_with_escapes() {
        let original = Manifest::canonical(vec![
            ManifestEntry::file("r\u{e9}sum\u{e9}.pdf", id("abcdef"), 40_000),
            ManifestEntry::directory("\u{1f4c1}", id("012345")),
        ]);

        assert_eq!(Manifest::decode(&original.encode()).unwrap(), original);
    }

    #[test]
    fn test_decode_accepts_compact_whitespace() {
        let manifest = Manifest::decode(br#"{"a":["01",3],"b":["02",0]}"#).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.entries()[1].is_directory());
    }

    #[test]
    fn test_decode_rejects_malformed_structures() {
        let cases: &[&[u8]] = &[
            b"",
            b"not json",
            b"[]",
            br#"{"a": "01"}"#,
            br#"{"a": ["01"]}"#,
            br#"{"a": ["01", 1, 2]}"#,
            br#"{"a": ["01", -1]}"#,
            br#"{"a": ["01", 1.5]}"#,
            br#"{"a": [1, 1]}"#,
            br#"{"a": {"id": "01", "size": 1}}"#,
            br#"{"a": ["XYZ", 1]}"#,
            br#"{"a": ["01", 1], "a": ["02", 2]}"#,
        ];

        for case in cases {
            let result = Manifest::decode(case);
            assert!(
                matches!(result, Err(SnapError::CorruptManifest { .. })),
                "expected corrupt manifest for {:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn test_decode_rejects_traversing_names() {
        for name in ["", ".", "..", "a/b", "../etc", "nul\\u0000"] {
            let bytes = format!(r#"{{"{}": ["01", 1]}}"#, name);
            assert!(
                Manifest::decode(bytes.as_bytes()).is_err(),
                "name {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_identifier_independent_of_insertion_order() {
        let entries = vec![
            ManifestEntry::file("one", id("01"), 1),
            ManifestEntry::file("two", id("02"), 1),
            ManifestEntry::directory("three", id("03")),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();

        let length = HashLength::default();
        assert_eq!(
            Manifest::canonical(entries).identifier(length),
            Manifest::canonical(reversed).identifier(length)
        );
    }
}
