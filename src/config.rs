//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution
//! order:
//! 1. explicit path (CLI flag)
//! 2. `~/.vexillum/config.toml` (user)
//! 3. `/etc/vexillum/config.toml` (system)
//!
//! API keys may live in the file or in the environment
//! (`PEXELS_API_KEY`, `PIXABAY_API_KEY`, `FLICKR_API_KEY`,
//! `UNSPLASH_API_KEY`); the environment wins.
//!
//! ```toml
//! [providers]
//! selection = "all"
//! pexels = "..."
//!
//! [search]
//! size = "large"
//! orientation = "landscape"
//!
//! [cache]
//! max_entries = 30
//! max_age = 1800000        # ms
//! shuffle_max_age = 5000   # ms
//!
//! [rate_limit]
//! min_interval = 1000      # ms
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::engine::CoordinatorConfig;
use crate::pipeline::SearchConfig;
use crate::providers::{ProviderKind, ProviderSelection, RateLimitConfig};
use crate::{Result, VexillumError};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BannerConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Provider selection and API keys.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// `"all"` or a provider name. Default: all.
    #[serde(default)]
    pub selection: ProviderSelection,
    #[serde(default)]
    pub pexels: Option<String>,
    #[serde(default)]
    pub pixabay: Option<String>,
    #[serde(default)]
    pub flickr: Option<String>,
    #[serde(default)]
    pub unsplash: Option<String>,
    /// HTTP request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            selection: ProviderSelection::default(),
            pexels: None,
            pixabay: None,
            flickr: None,
            unsplash: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

impl ProvidersConfig {
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        let key = match kind {
            ProviderKind::Pexels => &self.pexels,
            ProviderKind::Pixabay => &self.pixabay,
            ProviderKind::Flickr => &self.flickr,
            ProviderKind::Unsplash => &self.unsplash,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn slot(&mut self, kind: ProviderKind) -> &mut Option<String> {
        match kind {
            ProviderKind::Pexels => &mut self.pexels,
            ProviderKind::Pixabay => &mut self.pixabay,
            ProviderKind::Flickr => &mut self.flickr,
            ProviderKind::Unsplash => &mut self.unsplash,
        }
    }
}

impl BannerConfig {
    /// Load configuration from the standard locations, then overlay API
    /// keys from the environment.
    ///
    /// With no explicit path and no config file present, defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    VexillumError::Configuration(format!("Failed to read config file {path:?}: {e}"))
                })?;
                Self::parse(&content).map_err(|e| match e {
                    VexillumError::Configuration(msg) => {
                        VexillumError::Configuration(format!("{path:?}: {msg}"))
                    }
                    other => other,
                })?
            }
            None => Self::default(),
        };
        Ok(config.with_env_keys(|name| std::env::var(name).ok()))
    }

    /// Parse a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            VexillumError::Configuration(format!("Failed to parse config: {e}"))
        })
    }

    /// Overlay API keys from an environment lookup. Non-empty values win.
    pub fn with_env_keys(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for kind in ProviderKind::ALL {
            if let Some(key) = lookup(kind.env_var()).filter(|k| !k.trim().is_empty()) {
                *self.providers.slot(kind) = Some(key);
            }
        }
        self
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(VexillumError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".vexillum").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/vexillum/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
