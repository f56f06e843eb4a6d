//! Provider lookup table and selection policy.
//!
//! The registry holds at most one [`ImageProvider`] per [`ProviderKind`]
//! together with the API keys the host configured. A keyword lookup asks
//! [`ProviderRegistry::select`] for a provider:
//!
//! - [`ProviderSelection::Provider`]: always that provider, or nothing if
//!   it has no key
//! - [`ProviderSelection::All`]: a random provider among those with a key

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;

use super::rate_limit::RateLimiter;
use super::traits::{ImageProvider, ProviderKind};
use super::{FlickrProvider, PexelsProvider, PixabayProvider, UnsplashProvider};
use crate::{Result, VexillumError};

/// Which provider keyword lookups use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ProviderSelection {
    /// Random choice among providers with an API key.
    #[default]
    All,
    Provider(ProviderKind),
}

impl FromStr for ProviderSelection {
    type Err = VexillumError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(ProviderSelection::All)
        } else {
            s.parse().map(ProviderSelection::Provider)
        }
    }
}

impl TryFrom<String> for ProviderSelection {
    type Error = VexillumError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSelection::All => f.write_str("all"),
            ProviderSelection::Provider(kind) => kind.fmt(f),
        }
    }
}

/// Providers keyed by kind, plus their API keys.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
    api_keys: HashMap<ProviderKind, String>,
    selection: ProviderSelection,
}

impl ProviderRegistry {
    /// Create an empty registry (no providers, no keys).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four built-in providers sharing one HTTP client
    /// and one rate limiter.
    pub fn with_defaults(http: Client, limiter: Arc<RateLimiter>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PexelsProvider::new(http.clone(), limiter.clone())));
        registry.register(Arc::new(PixabayProvider::new(http.clone(), limiter.clone())));
        registry.register(Arc::new(FlickrProvider::new(http.clone(), limiter.clone())));
        registry.register(Arc::new(UnsplashProvider::new(http, limiter)));
        registry
    }

    /// Add a provider, replacing any existing provider of the same kind.
    pub fn register(&mut self, provider: Arc<dyn ImageProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Set the API key for a provider. Blank keys clear it.
    pub fn set_api_key(&mut self, kind: ProviderKind, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            self.api_keys.remove(&kind);
        } else {
            self.api_keys.insert(kind, key.trim().to_string());
        }
    }

    pub fn set_selection(&mut self, selection: ProviderSelection) {
        self.selection = selection;
    }

    pub fn selection(&self) -> ProviderSelection {
        self.selection
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        self.api_keys.get(&kind).map(String::as_str)
    }

    /// Kinds that have both a provider and an API key, in stable order.
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k) && self.api_keys.contains_key(k))
            .collect()
    }

    /// Pick the provider for the next keyword lookup, with its key.
    ///
    /// `None` means no network call should be made.
    pub fn select(&self) -> Option<(Arc<dyn ImageProvider>, String)> {
        let kind = match self.selection {
            ProviderSelection::Provider(kind) => kind,
            ProviderSelection::All => *self.configured().choose(&mut rand::thread_rng())?,
        };
        let provider = self.providers.get(&kind)?.clone();
        let key = self.api_keys.get(&kind)?.clone();
        Some((provider, key))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::providers::ImageQuery;

    struct Named(ProviderKind);

    #[async_trait]
    impl ImageProvider for Named {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn fetch(&self, _api_key: &str, _query: &ImageQuery) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn registry_with_all() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for kind in ProviderKind::ALL {
            registry.register(Arc::new(Named(kind)));
        }
        registry
    }

    #[test]
    fn selection_parses() {
        assert_eq!("all".parse::<ProviderSelection>().unwrap(), ProviderSelection::All);
        assert_eq!(
            "Unsplash".parse::<ProviderSelection>().unwrap(),
            ProviderSelection::Provider(ProviderKind::Unsplash)
        );
        assert!("bing".parse::<ProviderSelection>().is_err());
    }

    #[test]
    fn specific_selection_requires_key() {
        let mut registry = registry_with_all();
        registry.set_selection(ProviderSelection::Provider(ProviderKind::Flickr));
        assert!(registry.select().is_none());

        registry.set_api_key(ProviderKind::Flickr, "k");
        let (provider, key) = registry.select().unwrap();
        assert_eq!(provider.kind(), ProviderKind::Flickr);
        assert_eq!(key, "k");
    }

    #[test]
    fn all_selection_only_picks_keyed_providers() {
        let mut registry = registry_with_all();
        registry.set_api_key(ProviderKind::Pixabay, "k");
        for _ in 0..20 {
            let (provider, _) = registry.select().unwrap();
            assert_eq!(provider.kind(), ProviderKind::Pixabay);
        }
    }

    #[test]
    fn blank_key_clears() {
        let mut registry = registry_with_all();
        registry.set_api_key(ProviderKind::Pexels, "k");
        registry.set_api_key(ProviderKind::Pexels, "   ");
        assert!(registry.configured().is_empty());
    }
}
