//! Builder for configuring engine instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{BannerEngine, CoordinatorConfig};
use crate::cache::{BannerCache, CacheConfig};
use crate::config::BannerConfig;
use crate::pipeline::{ResolutionPipeline, SearchConfig};
use crate::providers::{
    ImageProvider, ProviderKind, ProviderRegistry, ProviderSelection, RateLimitConfig, RateLimiter,
};
use crate::vault::{FsVault, Vault};
use crate::{Result, VexillumError};

/// Main entry point for creating engine instances.
pub struct Vexillum;

impl Vexillum {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> VexillumBuilder {
        VexillumBuilder::new()
    }
}

/// Builder for configuring engine instances.
pub struct VexillumBuilder {
    vault: Option<Arc<dyn Vault>>,
    api_keys: Vec<(ProviderKind, String)>,
    selection: ProviderSelection,
    custom_providers: Vec<Arc<dyn ImageProvider>>,
    search: SearchConfig,
    cache: CacheConfig,
    rate_limit: RateLimitConfig,
    coordinator: CoordinatorConfig,
    timeout_secs: Option<u64>,
}

impl VexillumBuilder {
    pub fn new() -> Self {
        Self {
            vault: None,
            api_keys: Vec::new(),
            selection: ProviderSelection::default(),
            custom_providers: Vec::new(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            coordinator: CoordinatorConfig::default(),
            timeout_secs: None,
        }
    }

    /// Start from a loaded configuration. Later calls override it.
    pub fn from_config(config: &BannerConfig) -> Self {
        let mut builder = Self::new()
            .selection(config.providers.selection)
            .search(config.search.clone())
            .cache(config.cache.clone())
            .rate_limit(config.rate_limit.clone())
            .coordinator(config.coordinator.clone())
            .timeout(config.providers.timeout_secs);
        for kind in ProviderKind::ALL {
            if let Some(key) = config.providers.api_key(kind) {
                builder = builder.api_key(kind, key);
            }
        }
        builder
    }

    /// Use a custom vault implementation.
    pub fn vault(mut self, vault: Arc<dyn Vault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Use a directory on disk as the vault.
    pub fn fs_vault(self, root: impl Into<PathBuf>) -> Self {
        self.vault(Arc::new(FsVault::new(root)))
    }

    pub fn api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.api_keys.push((kind, key.into()));
        self
    }

    /// Configure the Pexels API key.
    pub fn pexels(self, api_key: impl Into<String>) -> Self {
        self.api_key(ProviderKind::Pexels, api_key)
    }

    /// Configure the Pixabay API key.
    pub fn pixabay(self, api_key: impl Into<String>) -> Self {
        self.api_key(ProviderKind::Pixabay, api_key)
    }

    /// Configure the Flickr API key.
    pub fn flickr(self, api_key: impl Into<String>) -> Self {
        self.api_key(ProviderKind::Flickr, api_key)
    }

    /// Configure the Unsplash access key.
    pub fn unsplash(self, api_key: impl Into<String>) -> Self {
        self.api_key(ProviderKind::Unsplash, api_key)
    }

    /// Which provider keyword lookups use (default: random among keyed ones).
    pub fn selection(mut self, selection: ProviderSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Register a provider, replacing the built-in one of the same kind.
    pub fn provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.custom_providers.push(provider);
        self
    }

    pub fn search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Set the debounce window for forcing triggers.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.coordinator.debounce = window;
        self
    }

    /// Set the timeout for provider requests (seconds).
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the engine.
    ///
    /// A vault is required; providers are optional (keyword banners then
    /// resolve to nothing).
    pub fn build(self) -> Result<BannerEngine> {
        let vault = self.vault.ok_or_else(|| {
            VexillumError::Configuration("a vault is required to build the engine".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs.unwrap_or(30)))
            .build()
            .map_err(|e| VexillumError::Configuration(format!("HTTP client: {e}")))?;

        let limiter = Arc::new(RateLimiter::from_config(&self.rate_limit));

        let mut registry = ProviderRegistry::with_defaults(http, limiter.clone());
        for provider in self.custom_providers {
            registry.register(provider);
        }
        for (kind, key) in self.api_keys {
            registry.set_api_key(kind, key);
        }
        registry.set_selection(self.selection);

        let pipeline = ResolutionPipeline::new(vault, registry, self.search);
        Ok(BannerEngine::new(
            BannerCache::new(self.cache),
            limiter,
            pipeline,
            self.coordinator,
        ))
    }
}

impl Default for VexillumBuilder {
    fn default() -> Self {
        Self::new()
    }
}
