//! Test site generators and tree comparison helpers
//!
//! Sites are generated at runtime from a seed so every run sees the same bytes.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;
use walkdir::WalkDir;

const TEXT_EXTENSIONS: &[&str] = &["html", "css", "js", "txt", "json"];
const BINARY_EXTENSIONS: &[&str] = &["png", "jpg", "bin"];
const WORDS: &[&str] = &[
    "snapshot", "bucket", "manifest", "object", "static", "site", "page", "asset", "cache",
];

/// A generated static site with automatic cleanup
pub struct TestSite {
    temp_dir: TempDir,
    pub files: Vec<PathBuf>,
}

impl TestSite {
    /// Generate `file_count` files spread over `dir_count` nested directories
    pub fn generate(seed: u64, file_count: usize, dir_count: usize) -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut dirs = vec![PathBuf::new()];
        for i in 0..dir_count {
            let parent = dirs[rng.gen_range(0..dirs.len())].clone();
            let dir = parent.join(format!("dir{}", i));
            fs::create_dir_all(temp_dir.path().join(&dir))?;
            dirs.push(dir);
        }

        let mut files = Vec::with_capacity(file_count);
        for i in 0..file_count {
            let dir = &dirs[rng.gen_range(0..dirs.len())];
            let (ext, content) = if rng.gen_bool(0.7) {
                let ext = TEXT_EXTENSIONS[rng.gen_range(0..TEXT_EXTENSIONS.len())];
                (ext, text_content(&mut rng))
            } else {
                let ext = BINARY_EXTENSIONS[rng.gen_range(0..BINARY_EXTENSIONS.len())];
                let len = rng.gen_range(1..4096);
                (ext, (0..len).map(|_| rng.gen::<u8>()).collect())
            };
            let rel = dir.join(format!("file{}.{}", i, ext));
            fs::write(temp_dir.path().join(&rel), content)
                .with_context(|| format!("writing {}", rel.display()))?;
            files.push(rel);
        }

        Ok(Self { temp_dir, files })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }
}

fn text_content(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let words = rng.gen_range(1..800);
    let mut out = String::new();
    for _ in 0..words {
        out.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
        out.push(' ');
    }
    out.into_bytes()
}

/// Relative path -> file bytes, or `None` for a directory
pub type TreeContents = BTreeMap<String, Option<Vec<u8>>>;

/// Everything under `root`, skipping empty files and the given names
pub fn tree_contents(root: &Path, skip_names: &[&str]) -> Result<TreeContents> {
    let mut contents = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if skip_names.contains(&&*name) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)?
            .to_string_lossy()
            .replace('\\', "/");
        if entry.file_type().is_dir() {
            contents.insert(rel, None);
        } else if entry.file_type().is_file() {
            let data = fs::read(entry.path())?;
            if !data.is_empty() {
                contents.insert(rel, Some(data));
            }
        }
    }
    Ok(contents)
}
