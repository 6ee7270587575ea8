//! Enrichment cache: one JSON file per (municipality, source content hash).
//!
//! Entries live under one of two roots chosen by [`DataSource`], named
//! `{kommune}_{hash[..8]}.json`. An entry is only served when its
//! `cache_version` equals the current version and its column list carries
//! the simplified-category column; anything else reads as stale.
//!
//! **Write rules:**
//! - Every write goes to a uniquely named temp file in the target directory
//!   and is renamed over the final path, so readers never see a partial file.
//! - Output is a pure function of the entry (no timestamps), so concurrent
//!   writers of the same key produce identical bytes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use matrikkel_shared::columns::FORENKLET_BYGNINGS_KATEGORI;
use matrikkel_shared::{
    CACHE_VERSION, DataSource, MatrikkelError, RecordSet, Result, RunStatistics,
};

/// Column a cached table must list to be usable.
pub const REQUIRED_COLUMN: &str = FORENKLET_BYGNINGS_KATEGORI;

/// Length of the hash prefix used in cache file names.
const HASH_PREFIX_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Cache file format
// ---------------------------------------------------------------------------

/// A `data` / `columns` pair: rows as objects plus their column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedTable {
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl CachedTable {
    pub fn from_set(set: &RecordSet) -> Self {
        Self {
            data: set.to_rows(),
            columns: set.columns.clone(),
        }
    }

    pub fn into_set(self) -> RecordSet {
        RecordSet::from_rows(self.columns, self.data)
    }
}

/// Snapshot of one pipeline run. The top-level `data` / `columns` hold the
/// filtered set; the nested tables hold the other variants and may be absent
/// in entries written by older builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub cache_version: String,
    #[serde(default)]
    pub statistics: RunStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicated: Option<CachedTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfiltered: Option<CachedTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfiltered_deduplicated: Option<CachedTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_status: Option<CachedTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_status_deduplicated: Option<CachedTable>,
}

impl CacheEntry {
    /// Entry for `filtered` stamped with `version`; nested tables start empty.
    pub fn new(filtered: &RecordSet, statistics: RunStatistics, version: &str) -> Self {
        Self {
            data: filtered.to_rows(),
            columns: filtered.columns.clone(),
            cache_version: version.to_string(),
            statistics,
            deduplicated: None,
            unfiltered: None,
            unfiltered_deduplicated: None,
            excluded_status: None,
            excluded_status_deduplicated: None,
        }
    }

    /// The primary (filtered) table as a record set.
    pub fn primary_set(&self) -> RecordSet {
        RecordSet::from_rows(self.columns.clone(), self.data.clone())
    }
}

/// Result of a validated cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Entry is current and usable.
    Hit(Box<CacheEntry>),
    /// An entry exists but must be rebuilt.
    Stale { reason: String },
    /// No entry, or the file could not be parsed.
    Miss,
}

// ---------------------------------------------------------------------------
// EnrichmentCache
// ---------------------------------------------------------------------------

/// File-backed cache with separate roots for raw and imputed sources.
#[derive(Debug, Clone)]
pub struct EnrichmentCache {
    raw_root: PathBuf,
    imputed_root: PathBuf,
    version: String,
}

impl EnrichmentCache {
    pub fn new(raw_root: impl Into<PathBuf>, imputed_root: impl Into<PathBuf>) -> Self {
        Self {
            raw_root: raw_root.into(),
            imputed_root: imputed_root.into(),
            version: CACHE_VERSION.to_string(),
        }
    }

    /// Override the version entries are stamped with and validated against.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self, source: DataSource) -> &Path {
        match source {
            DataSource::Raw => &self.raw_root,
            DataSource::Imputed => &self.imputed_root,
        }
    }

    /// `{root}/{kommune}_{hash[..8]}.json`.
    pub fn cache_path(&self, hash: &str, kommune: &str, source: DataSource) -> PathBuf {
        let prefix: String = hash.chars().take(HASH_PREFIX_LEN).collect();
        self.root(source)
            .join(format!("{}_{prefix}.json", cache_file_stem(kommune)))
    }

    /// Read an entry without validating it. Absent and unparsable files
    /// both read as `None`; the latter is logged.
    pub fn get(&self, hash: &str, kommune: &str, source: DataSource) -> Option<CacheEntry> {
        let path = self.cache_path(hash, kommune, source);
        if !path.is_file() {
            debug!(path = %path.display(), "cache miss");
            return None;
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot read cache file");
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(path = %path.display(), error = %e, "corrupted cache file");
                None
            }
        }
    }

    /// Read and validate an entry against the current version and the
    /// required column.
    pub fn lookup(&self, hash: &str, kommune: &str, source: DataSource) -> CacheLookup {
        let Some(entry) = self.get(hash, kommune, source) else {
            return CacheLookup::Miss;
        };

        if entry.cache_version != self.version {
            let reason = format!(
                "cache version '{}' does not match '{}'",
                entry.cache_version, self.version
            );
            warn!(kommune, %source, %reason, "stale cache entry, rebuilding");
            return CacheLookup::Stale { reason };
        }

        if !entry.columns.iter().any(|c| c == REQUIRED_COLUMN) {
            let reason = format!("cached columns lack '{REQUIRED_COLUMN}'");
            warn!(kommune, %source, %reason, "incompatible cache entry, rebuilding");
            return CacheLookup::Stale { reason };
        }

        info!(kommune, %source, "valid cache hit");
        CacheLookup::Hit(Box::new(entry))
    }

    /// Write an entry atomically, returning its path.
    pub fn put(
        &self,
        entry: &CacheEntry,
        hash: &str,
        kommune: &str,
        source: DataSource,
    ) -> Result<PathBuf> {
        let path = self.cache_path(hash, kommune, source);
        write_json_atomic(&path, entry)?;
        info!(path = %path.display(), rows = entry.data.len(), "saved cache entry");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hex SHA-256 of the source bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serialize `payload` as pretty UTF-8 JSON to a temp file beside `path`,
/// then rename it into place. The temp file is removed on failure.
pub fn write_json_atomic<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| MatrikkelError::Storage(format!("{} has no parent", path.display())))?;
    std::fs::create_dir_all(dir).map_err(|e| MatrikkelError::io(dir, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{name}.{}.tmp", Uuid::now_v7().simple()));

    let bytes = serde_json::to_vec_pretty(payload)
        .map_err(|e| MatrikkelError::Storage(format!("cannot serialize cache entry: {e}")))?;

    let written = std::fs::write(&temp, &bytes)
        .map_err(|e| MatrikkelError::io(&temp, e))
        .and_then(|()| std::fs::rename(&temp, path).map_err(|e| MatrikkelError::io(path, e)));

    if written.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    written
}

/// File-name-safe form of a municipality name: trimmed, path separators
/// replaced, `unknown` when empty.
fn cache_file_stem(kommune: &str) -> String {
    let trimmed = kommune.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}
