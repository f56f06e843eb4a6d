//! Image provider trait and the query types shared by every adapter.
//!
//! Each remote image-search service implements [`ImageProvider`]. The
//! [`ProviderRegistry`](super::ProviderRegistry) keeps one provider per
//! [`ProviderKind`] and decides which one a keyword lookup goes to.
//!
//! # Soft misses
//!
//! `fetch` distinguishes two kinds of "no image":
//! - `Ok(None)`: the service answered but had nothing usable (bad key,
//!   non-2xx status, unparseable body, empty result set)
//! - `Err(_)`: the request never completed (transport failure)
//!
//! Only the latter is reported to the host as a failure.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Result, VexillumError};

/// Supported image-search services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Pexels,
    Pixabay,
    Flickr,
    Unsplash,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Pexels,
        ProviderKind::Pixabay,
        ProviderKind::Flickr,
        ProviderKind::Unsplash,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "pexels",
            ProviderKind::Pixabay => "pixabay",
            ProviderKind::Flickr => "flickr",
            ProviderKind::Unsplash => "unsplash",
        }
    }

    /// Environment variable consulted for this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::Pexels => "PEXELS_API_KEY",
            ProviderKind::Pixabay => "PIXABAY_API_KEY",
            ProviderKind::Flickr => "FLICKR_API_KEY",
            ProviderKind::Unsplash => "UNSPLASH_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = VexillumError;

    fn from_str(s: &str) -> Result<Self> {
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VexillumError::Configuration(format!("unknown image provider: {s}")))
    }
}

/// Preferred image size. Providers map it to their nearest bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Preferred image orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Square,
}

/// A single keyword lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageQuery {
    pub keyword: String,
    pub size: ImageSize,
    pub orientation: Orientation,
    /// How many results to ask for; one is picked at random.
    pub result_count: u32,
    /// Substitute keywords for providers that retry on an empty result.
    pub fallback_keywords: Vec<String>,
    /// Whether a substitute keyword may be used at all.
    pub allow_fallback: bool,
}

impl ImageQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            size: ImageSize::default(),
            orientation: Orientation::default(),
            result_count: 10,
            fallback_keywords: Vec::new(),
            allow_fallback: true,
        }
    }

    pub fn size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn result_count(mut self, n: u32) -> Self {
        self.result_count = n;
        self
    }

    pub fn fallback_keywords(mut self, keywords: Vec<String>) -> Self {
        self.fallback_keywords = keywords;
        self
    }

    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

/// A remote image-search service.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Provider name for logging/metrics.
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Look up one image URL for `query.keyword`.
    ///
    /// Returns `Ok(None)` for soft misses and `Err` only for transport
    /// failures.
    async fn fetch(&self, api_key: &str, query: &ImageQuery) -> Result<Option<String>>;
}
