//! Encoded vault images.
//!
//! Turning a vault image into something the renderer can display means
//! reading the whole file and base64-encoding it. [`LocalImageCache`] keeps
//! the resulting `data:` URLs so repeated banners for the same unchanged file
//! (several panes, shuffle cycles over a small pool) skip both steps.
//!
//! The key covers path, size and modification time, so an edited file
//! misses naturally and the stale encoding ages out through the TTL.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::vault::VaultFile;

/// Default number of encoded images kept in memory.
const DEFAULT_MAX_IMAGES: u64 = 64;

/// Default lifetime of an encoded image.
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// In-memory cache of encoded local images.
pub struct LocalImageCache {
    cache: Cache<u64, String>,
}

impl LocalImageCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_IMAGES, DEFAULT_TTL)
    }

    pub fn with_limits(max_images: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_images)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn get(&self, file: &VaultFile) -> Option<String> {
        self.cache.get(&file_key(file)).await
    }

    pub async fn insert(&self, file: &VaultFile, data_url: String) {
        self.cache.insert(file_key(file), data_url).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for LocalImageCache {
    fn default() -> Self {
        Self::new()
    }
}

fn file_key(file: &VaultFile) -> u64 {
    let mut hasher = DefaultHasher::new();
    file.path.hash(&mut hasher);
    file.size.hash(&mut hasher);
    file.modified.hash(&mut hasher);
    hasher.finish()
}
