//! Pexels search API client.
//!
//! See: <https://www.pexels.com/api/documentation/#photos-search>
//!
//! Pexels is the only adapter with a fallback keyword: when the requested
//! keyword finds nothing, one retry is made with a random keyword from the
//! configured fallback list, unless the query disables it.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::http::{get_json, pick_random};
use super::rate_limit::RateLimiter;
use super::traits::{ImageProvider, ImageQuery, ImageSize, Orientation, ProviderKind};
use crate::Result;

/// Default base URL for the Pexels API
const DEFAULT_BASE_URL: &str = "https://api.pexels.com/v1";

/// Pexels caps `per_page` at 80.
const MAX_PER_PAGE: u32 = 80;

#[derive(Clone)]
pub struct PexelsProvider {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl PexelsProvider {
    pub fn new(http: Client, limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(http, limiter, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        http: Client,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            limiter,
        }
    }

    async fn search(&self, api_key: &str, keyword: &str, query: &ImageQuery) -> Result<Option<String>> {
        let per_page = query.result_count.clamp(1, MAX_PER_PAGE).to_string();
        let request = self
            .http
            .get(format!("{}/search", self.base_url))
            .header("Authorization", api_key)
            .query(&[
                ("query", keyword),
                ("per_page", per_page.as_str()),
                ("orientation", orientation_param(query.orientation)),
                ("size", size_param(query.size)),
            ]);

        let Some(body) = get_json::<SearchResponse>(&self.limiter, "pexels", request).await? else {
            return Ok(None);
        };

        let urls = body
            .photos
            .into_iter()
            .filter_map(|photo| photo.src.url_for(query.size))
            .collect();
        Ok(pick_random("pexels", keyword, urls))
    }
}

fn orientation_param(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Landscape => "landscape",
        Orientation::Portrait => "portrait",
        Orientation::Square => "square",
    }
}

fn size_param(size: ImageSize) -> &'static str {
    match size {
        ImageSize::Small => "small",
        ImageSize::Medium => "medium",
        ImageSize::Large => "large",
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Deserialize)]
struct PhotoSources {
    original: Option<String>,
    large2x: Option<String>,
    large: Option<String>,
    medium: Option<String>,
}

impl PhotoSources {
    fn url_for(self, size: ImageSize) -> Option<String> {
        match size {
            ImageSize::Small => self.medium.or(self.large),
            ImageSize::Medium => self.large.or(self.large2x),
            ImageSize::Large => self.large2x.or(self.original),
        }
    }
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pexels
    }

    async fn fetch(&self, api_key: &str, query: &ImageQuery) -> Result<Option<String>> {
        if let Some(url) = self.search(api_key, &query.keyword, query).await? {
            return Ok(Some(url));
        }
        if !query.allow_fallback {
            return Ok(None);
        }

        let candidates: Vec<&String> = query
            .fallback_keywords
            .iter()
            .filter(|k| !k.trim().is_empty() && !k.trim().eq_ignore_ascii_case(&query.keyword))
            .collect();
        let Some(fallback) = candidates.choose(&mut rand::thread_rng()).map(|k| k.trim().to_string())
        else {
            return Ok(None);
        };

        debug!(keyword = %query.keyword, fallback = %fallback, "retrying pexels with fallback keyword");
        self.search(api_key, &fallback, query).await
    }
}
