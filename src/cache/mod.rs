//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`BannerCache`]: resolved banner per (document, view, shuffle) key,
//!   bounded by entry count and by a per-kind maximum age. Owned by the
//!   [`BannerEngine`](crate::BannerEngine); only the engine writes to it.
//!
//! - [`local::LocalImageCache`]: encoded `data:` URLs for vault images,
//!   keyed on file identity, so an unchanged file is read and encoded once.

pub mod local;

pub use local::LocalImageCache;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the banner cache.
///
/// ```rust
/// # use vexillum::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(50)
///     .shuffle_max_age(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries. Default: 30.
    pub max_entries: usize,
    /// Maximum age of static entries. Default: 30 minutes.
    #[serde(with = "millis")]
    pub max_age: Duration,
    /// Maximum age of shuffled entries. Default: 5 seconds.
    #[serde(with = "millis")]
    pub shuffle_max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 30,
            max_age: Duration::from_millis(1_800_000),
            shuffle_max_age: Duration::from_millis(5_000),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries (at least 1).
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n.max(1);
        self
    }

    /// Set the maximum age of static entries.
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = age;
        self
    }

    /// Set the maximum age of shuffled entries.
    pub fn shuffle_max_age(mut self, age: Duration) -> Self {
        self.shuffle_max_age = age;
        self
    }

    /// Freshness window for an entry kind.
    pub fn max_age_for(&self, kind: EntryKind) -> Duration {
        match kind {
            EntryKind::Static => self.max_age,
            EntryKind::Shuffled => self.shuffle_max_age,
        }
    }
}

/// Durations in config files are written as integer milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Whether an entry came from a shuffle (short-lived) or a regular update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Static,
    Shuffled,
}

/// A resolved banner.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub document_path: String,
    /// URL, `data:` URL, or vault path handed to the renderer.
    pub image_ref: String,
    /// Normalized configuration value the image was resolved from.
    pub source: String,
    pub created_at: Instant,
    pub kind: EntryKind,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Derive the cache key for a document shown in a view.
///
/// Components are length-prefixed so no choice of path or view id can
/// collide with another pair.
pub fn make_key(document_path: &str, view_id: &str, shuffled: bool) -> String {
    let marker = if shuffled { "shuffle" } else { "static" };
    format!(
        "{}:{}|{}:{}|{marker}",
        document_path.len(),
        document_path,
        view_id.len(),
        view_id
    )
}

/// Bounded banner cache.
///
/// Freshness is enforced lazily: [`get`](Self::get) treats expired entries
/// as absent, and [`sweep`](Self::sweep) physically removes them. The size
/// bound is enforced eagerly on every [`put`](Self::put), evicting the
/// oldest entries first.
pub struct BannerCache {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl BannerCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fresh entry for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .cloned()
    }

    /// Entry for `key` regardless of age.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Insert or overwrite the entry for `key`, then evict oldest entries
    /// until the size bound holds.
    pub fn put(
        &self,
        key: impl Into<String>,
        document_path: impl Into<String>,
        image_ref: impl Into<String>,
        source: impl Into<String>,
        kind: EntryKind,
    ) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            document_path: document_path.into(),
            image_ref: image_ref.into(),
            source: source.into(),
            created_at: Instant::now(),
            kind,
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.clone(), entry);

        while entries.len() > self.config.max_entries {
            // Never evict the entry just written.
            let oldest = entries
                .values()
                .filter(|e| e.key != key)
                .min_by_key(|e| e.created_at)
                .map(|e| e.key.clone());
            let Some(oldest) = oldest else { break };
            entries.remove(&oldest);
            metrics::counter!(telemetry::EVICTIONS_TOTAL).increment(1);
            debug!(key = %oldest, "evicted oldest banner cache entry");
        }
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    /// Remove every entry belonging to a document, across all views and
    /// shuffle states. Returns the number removed.
    pub fn invalidate_document(&self, document_path: &str) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, e| e.document_path != document_path);
        before - entries.len()
    }

    /// Keys of all entries (fresh or not) belonging to a document.
    pub fn keys_for_document(&self, document_path: &str) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .values()
            .filter(|e| e.document_path == document_path)
            .map(|e| e.key.clone())
            .collect()
    }

    /// Remove stale entries, or everything when `force` is set. Returns the
    /// number removed.
    pub fn sweep(&self, force: bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        if force {
            entries.clear();
        } else {
            entries.retain(|_, e| self.is_fresh(e));
        }
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, force, "swept banner cache");
        }
        removed
    }

    /// Number of physically stored entries (including unswept stale ones).
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.age() <= self.config.max_age_for(entry.kind)
    }
}

impl Default for BannerCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
