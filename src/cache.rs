//! Explicit, source-keyed cache for loaded order datasets.
//!
//! A cached dataset is reused only while its source file keeps the same
//! canonical path, modification time and length. Anything else triggers a
//! fresh parse.

use crate::error::{QrAnalyticsError, Result};
use crate::ingestion::{load_orders_with_config, Dataset};
use crate::schema::LoaderConfig;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Identity of a source file at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceFingerprint {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| QrAnalyticsError::LoadError {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

struct CacheEntry {
    fingerprint: SourceFingerprint,
    dataset: Arc<Dataset>,
    /// Paths callers used to reach this entry, matched on invalidation once
    /// the file is gone and can no longer be canonicalized.
    aliases: HashSet<PathBuf>,
}

/// Memoizes parsed datasets per source file.
pub struct DatasetCache {
    config: LoaderConfig,
    entries: HashMap<PathBuf, CacheEntry>,
}

impl DatasetCache {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Returns the dataset for `path`, parsing it only if it is not cached or
    /// the file changed since it was cached.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<Dataset>> {
        let path = path.as_ref();
        let key = canonical_key(path)?;
        let fingerprint = SourceFingerprint::of(&key)?;

        let mut aliases = HashSet::new();
        if let Some(entry) = self.entries.get_mut(&key) {
            if entry.fingerprint == fingerprint {
                debug!("Dataset cache hit for {}", key.display());
                entry.aliases.insert(path.to_path_buf());
                return Ok(Arc::clone(&entry.dataset));
            }
            debug!("Dataset cache stale for {}, reloading", key.display());
            aliases = std::mem::take(&mut entry.aliases);
        }

        let dataset = Arc::new(load_orders_with_config(&key, &self.config)?);
        aliases.insert(path.to_path_buf());
        self.entries.insert(
            key,
            CacheEntry {
                fingerprint,
                dataset: Arc::clone(&dataset),
                aliases,
            },
        );
        Ok(dataset)
    }

    /// Drops the cached dataset for `path`. Returns whether anything was removed.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let before = self.entries.len();
        self.entries
            .retain(|cached, entry| *cached != key && !entry.aliases.contains(path));
        let removed = self.entries.len() < before;
        if removed {
            debug!("Invalidated cached dataset for {}", path.display());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

fn canonical_key(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| QrAnalyticsError::LoadError {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}
