//! Pixabay search API client.
//!
//! See: <https://pixabay.com/api/docs/>

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{get_json, pick_random};
use super::rate_limit::RateLimiter;
use super::traits::{ImageProvider, ImageQuery, ImageSize, Orientation, ProviderKind};
use crate::Result;

/// Default base URL for the Pixabay API
const DEFAULT_BASE_URL: &str = "https://pixabay.com/api";

/// Pixabay rejects `per_page` outside 3..=200.
const PER_PAGE_RANGE: (u32, u32) = (3, 200);

#[derive(Clone)]
pub struct PixabayProvider {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl PixabayProvider {
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
}

// Pixabay has no square filter; "all" is the nearest bucket.
fn orientation_param(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Landscape => "horizontal",
        Orientation::Portrait => "vertical",
        Orientation::Square => "all",
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
}

impl Hit {
    fn url_for(self, size: ImageSize) -> Option<String> {
        match size {
            ImageSize::Small => self.webformat_url.or(self.large_image_url),
            ImageSize::Medium | ImageSize::Large => self.large_image_url.or(self.webformat_url),
        }
    }
}

#[async_trait]
impl ImageProvider for PixabayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pixabay
    }

    async fn fetch(&self, api_key: &str, query: &ImageQuery) -> Result<Option<String>> {
        let per_page = query
            .result_count
            .clamp(PER_PAGE_RANGE.0, PER_PAGE_RANGE.1)
            .to_string();
        let request = self.http.get(format!("{}/", self.base_url)).query(&[
            ("key", api_key),
            ("q", query.keyword.as_str()),
            ("image_type", "photo"),
            ("safesearch", "true"),
            ("per_page", per_page.as_str()),
            ("orientation", orientation_param(query.orientation)),
        ]);

        let Some(body) = get_json::<SearchResponse>(&self.limiter, "pixabay", request).await? else {
            return Ok(None);
        };

        let urls = body
            .hits
            .into_iter()
            .filter_map(|hit| hit.url_for(query.size))
            .collect();
        Ok(pick_random("pixabay", &query.keyword, urls))
    }
}
