//! Image resolution: classified banner value in, renderable reference out.
//!
//! | kind          | resolution                                          |
//! |---------------|-----------------------------------------------------|
//! | url           | returned unchanged                                  |
//! | obsidian link | link → vault path → `data:` URL                     |
//! | vault path    | `data:` URL                                         |
//! | keyword       | random comma-separated candidate → image provider   |
//! | invalid       | nothing                                             |
//!
//! Only transport failures from a provider come back as `Err`. Missing
//! files, unreadable files and provider soft misses all become `Ok(None)`.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::LocalImageCache;
use crate::input::{self, InputDescriptor, InputKind};
use crate::providers::{ImageQuery, ImageSize, Orientation, ProviderRegistry};
use crate::vault::{Vault, VaultFile};
use crate::{Result, VexillumError};

/// Keyword search preferences passed to every provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub size: ImageSize,
    pub orientation: Orientation,
    /// Results requested per search. Default: 10.
    pub result_count: u32,
    /// Substitutes for keywords that find nothing (Pexels only).
    pub fallback_keywords: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            orientation: Orientation::default(),
            result_count: 10,
            fallback_keywords: ["nature", "abstract", "landscape", "technology"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Composes classification, vault reads and provider lookups.
pub struct ResolutionPipeline {
    vault: Arc<dyn Vault>,
    providers: ProviderRegistry,
    search: SearchConfig,
    local_images: LocalImageCache,
}

impl ResolutionPipeline {
    pub fn new(vault: Arc<dyn Vault>, providers: ProviderRegistry, search: SearchConfig) -> Self {
        Self {
            vault,
            providers,
            search,
            local_images: LocalImageCache::new(),
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn classify(&self, raw: &Value) -> InputDescriptor {
        input::classify(raw, self.vault.as_ref())
    }

    /// [`classify`](Self::classify) with the vault lookup on the blocking
    /// pool.
    pub async fn classify_detached(&self, raw: &Value) -> Result<InputDescriptor> {
        let raw = raw.clone();
        self.lookup(move |vault| input::classify(&raw, vault)).await
    }

    /// Resolve a classified value for the document at `context_path`.
    ///
    /// `allow_fallback` gates substitute keywords; the shuffle path turns
    /// it off so a shuffled banner never shows an unrelated image.
    pub async fn resolve(
        &self,
        descriptor: &InputDescriptor,
        context_path: &str,
        allow_fallback: bool,
    ) -> Result<Option<String>> {
        match descriptor.kind {
            InputKind::Url => Ok(Some(descriptor.value.clone())),
            InputKind::ObsidianLink => {
                let Some(target) = descriptor.link_target() else {
                    return Ok(None);
                };
                let resolved = {
                    let (link, context) = (target.to_string(), context_path.to_string());
                    self.lookup(move |vault| vault.resolve_link(&link, &context))
                        .await?
                };
                match resolved {
                    Some(path) => Ok(self.read_local(&path).await),
                    None => {
                        debug!(link = target, document = context_path, "banner link does not resolve");
                        Ok(None)
                    }
                }
            }
            InputKind::VaultPath => Ok(self.read_local(&descriptor.value).await),
            InputKind::Keyword => self.search_keyword(descriptor, allow_fallback).await,
            InputKind::Invalid => Ok(None),
        }
    }

    /// Run a synchronous vault lookup off the async workers; directory-backed
    /// vaults stat and walk the file system.
    async fn lookup<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Vault) -> T + Send + 'static,
    {
        let vault = Arc::clone(&self.vault);
        tokio::task::spawn_blocking(move || f(vault.as_ref()))
            .await
            .map_err(|e| VexillumError::Task(e.to_string()))
    }

    /// Drop encoded local images.
    pub fn clear(&self) {
        self.local_images.clear();
    }

    async fn search_keyword(
        &self,
        descriptor: &InputDescriptor,
        allow_fallback: bool,
    ) -> Result<Option<String>> {
        let keyword = {
            let candidates = descriptor.keywords();
            match candidates.choose(&mut rand::thread_rng()) {
                Some(k) => k.to_string(),
                None => return Ok(None),
            }
        };

        let Some((provider, api_key)) = self.providers.select() else {
            debug!(
                selection = %self.providers.selection(),
                "no API key for the selected image provider"
            );
            return Ok(None);
        };

        let query = ImageQuery::new(keyword)
            .size(self.search.size)
            .orientation(self.search.orientation)
            .result_count(self.search.result_count)
            .fallback_keywords(self.search.fallback_keywords.clone())
            .allow_fallback(allow_fallback);

        debug!(provider = provider.name(), keyword = %query.keyword, "searching for banner image");
        provider.fetch(&api_key, &query).await
    }

    /// Read a vault image and wrap it as a `data:` URL. Failures are logged
    /// and reported as no image.
    async fn read_local(&self, path: &str) -> Option<String> {
        let lookup = {
            let path = path.to_string();
            self.lookup(move |vault| vault.get_file(&path)).await
        };
        let file = match lookup {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!(path, "banner file not found in vault");
                return None;
            }
            Err(e) => {
                warn!(path, error = %e, "vault lookup failed");
                return None;
            }
        };
        let Some(mime) = mime_for(&file.extension) else {
            debug!(path, extension = %file.extension, "banner file is not an image");
            return None;
        };

        if let Some(cached) = self.local_images.get(&file).await {
            return Some(cached);
        }

        match self.encode(&file, mime).await {
            Ok(data_url) => {
                self.local_images.insert(&file, data_url.clone()).await;
                Some(data_url)
            }
            Err(e) => {
                warn!(path, error = %e, "could not load banner image from vault");
                None
            }
        }
    }

    async fn encode(&self, file: &VaultFile, mime: &str) -> Result<String> {
        let bytes = self.vault.read_binary(&file.path).await?;
        if bytes.is_empty() {
            return Err(VexillumError::LocalRead {
                path: file.path.clone(),
                message: "file is empty".to_string(),
            });
        }
        // SVG is markup, not a bitmap: it has to be valid text to render.
        if file.extension == "svg" && std::str::from_utf8(&bytes).is_err() {
            return Err(VexillumError::LocalRead {
                path: file.path.clone(),
                message: "SVG is not valid UTF-8".to_string(),
            });
        }
        Ok(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
    }
}

/// MIME type for a supported image extension.
pub fn mime_for(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}
