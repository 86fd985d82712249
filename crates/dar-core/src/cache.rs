//! Process-wide config cache keyed by file path and profile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::config::DarConfig;
use crate::error::Result;

type CacheKey = (PathBuf, Option<String>);

/// Loaded configs, one entry per `(path, profile)`.
///
/// Entries stay until [`ConfigCache::invalidate`] or [`ConfigCache::clear`];
/// a config reload goes through [`ConfigCache::reload`].
#[derive(Default)]
pub struct ConfigCache {
    entries: DashMap<CacheKey, Arc<DarConfig>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached config, loading it on first use.
    pub fn get(&self, path: &Path, profile: Option<&str>) -> Result<Arc<DarConfig>> {
        let key = (path.to_path_buf(), profile.map(str::to_string));
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }
        let config = Arc::new(DarConfig::load(path, profile)?);
        self.entries.insert(key, Arc::clone(&config));
        debug!(path = %path.display(), ?profile, "config cached");
        Ok(config)
    }

    /// Drop every cached profile of `path`, then load `profile` afresh.
    pub fn reload(&self, path: &Path, profile: Option<&str>) -> Result<Arc<DarConfig>> {
        self.invalidate(path);
        self.get(path, profile)
    }

    /// Seed an entry without touching the filesystem.
    pub fn insert(&self, path: &Path, profile: Option<&str>, config: DarConfig) {
        self.entries.insert(
            (path.to_path_buf(), profile.map(str::to_string)),
            Arc::new(config),
        );
    }

    pub fn invalidate(&self, path: &Path) {
        self.entries.retain(|(p, _), _| p != path);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
