//! Content hashing and the persisted asset hash cache.
//!
//! Every generated asset URL embeds a short content hash so that any byte
//! change produces a new URL. The hash is the first eight hex characters of
//! the SHA-256 digest: collisions inside a single site are accepted as
//! negligible, it is not a security property.
//!
//! # The hash cache
//!
//! [`HashCache`] is a JSON object mapping an asset's root-relative path to
//! the last hash seen for it (`hashes.json` by default). It is loaded once
//! before the asset walk and written once after it.
//!
//! The fresh hash is **always** recomputed from the current bytes; the stored
//! value only feeds [`HashCache::observe`], which reports whether the file is
//! new, unchanged, or changed. That report is advisory (it drives the CLI
//! summary) and never causes work to be skipped. Skipping re-hashing on an
//! unchanged entry would need a cheaper change signal than the bytes
//! themselves, which the cache does not store.
//!
//! Entries for files that disappeared from the asset tree are carried forward
//! untouched, so the file always holds the last-known hash of every path.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

/// Number of hex characters kept from the digest.
pub const HASH_LEN: usize = 8;

/// Short content hash of a byte slice.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}

/// Insert the hash before the extension: `css/site.css` → `css/site.1a2b3c4d.css`.
///
/// Works on POSIX-style relative paths; the directory part is preserved.
pub fn hashed_name(rel: &str, hash: &str) -> String {
    let (dir, file) = match rel.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, rel),
    };
    let renamed = match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}{}", &file[..dot], hash, &file[dot..]),
        _ => format!("{}.{}", file, hash),
    };
    match dir {
        Some(dir) => format!("{}/{}", dir, renamed),
        None => renamed,
    }
}

/// Outcome of comparing a fresh hash with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    New,
    Unchanged,
    Changed,
}

/// Persisted `relative path → hash` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashCache {
    entries: BTreeMap<String, String>,
}

impl HashCache {
    /// Create an empty cache (used for `--no-cache` or the first build).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from disk. Returns an empty cache if the file doesn't exist or
    /// can't be parsed.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => Self { entries },
            Err(_) => Self::empty(),
        }
    }

    /// Overwrite the cache file with the full current mapping.
    ///
    /// Written to a sibling temporary file first and renamed into place, so an
    /// interrupted build leaves either the old or the new cache behind.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    /// Last-known hash for a path.
    pub fn get(&self, rel: &str) -> Option<&str> {
        self.entries.get(rel).map(String::as_str)
    }

    /// Record a freshly computed hash and report how it compares to the
    /// stored one.
    pub fn observe(&mut self, rel: &str, fresh: &str) -> CacheStatus {
        match self.entries.insert(rel.to_string(), fresh.to_string()) {
            None => CacheStatus::New,
            Some(previous) if previous == fresh => CacheStatus::Unchanged,
            Some(_) => CacheStatus::Changed,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summary of asset handling for a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub unchanged: u32,
    pub changed: u32,
    pub new: u32,
    pub copied: u32,
    pub images: u32,
}

impl CacheStats {
    pub fn record(&mut self, status: CacheStatus) {
        match status {
            CacheStatus::New => self.new += 1,
            CacheStatus::Unchanged => self.unchanged += 1,
            CacheStatus::Changed => self.changed += 1,
        }
    }

    pub fn hashed(&self) -> u32 {
        self.unchanged + self.changed + self.new
    }

    pub fn total(&self) -> u32 {
        self.hashed() + self.copied + self.images
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hashed ({} unchanged, {} changed, {} new), {} images, {} copied ({} total)",
            self.hashed(),
            self.unchanged,
            self.changed,
            self.new,
            self.images,
            self.copied,
            self.total()
        )
    }
}
