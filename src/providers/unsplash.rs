//! Unsplash search API client.
//!
//! See: <https://unsplash.com/documentation#search-photos>

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{get_json, pick_random};
use super::rate_limit::RateLimiter;
use super::traits::{ImageProvider, ImageQuery, ImageSize, Orientation, ProviderKind};
use crate::Result;

/// Default base URL for the Unsplash API
const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

const MAX_PER_PAGE: u32 = 30;

#[derive(Clone)]
pub struct UnsplashProvider {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl UnsplashProvider {
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

fn orientation_param(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Landscape => "landscape",
        Orientation::Portrait => "portrait",
        Orientation::Square => "squarish",
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    full: Option<String>,
    regular: Option<String>,
    small: Option<String>,
}

impl PhotoUrls {
    fn url_for(self, size: ImageSize) -> Option<String> {
        match size {
            ImageSize::Small => self.small.or(self.regular),
            ImageSize::Medium => self.regular.or(self.full),
            ImageSize::Large => self.full.or(self.regular),
        }
    }
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unsplash
    }

    async fn fetch(&self, api_key: &str, query: &ImageQuery) -> Result<Option<String>> {
        let per_page = query.result_count.clamp(1, MAX_PER_PAGE).to_string();
        let request = self
            .http
            .get(format!("{}/search/photos", self.base_url))
            .header("Authorization", format!("Client-ID {api_key}"))
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query.keyword.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", orientation_param(query.orientation)),
            ]);

        let Some(body) = get_json::<SearchResponse>(&self.limiter, "unsplash", request).await? else {
            return Ok(None);
        };

        let urls = body
            .results
            .into_iter()
            .filter_map(|photo| photo.urls.url_for(query.size))
            .collect();
        Ok(pick_random("unsplash", &query.keyword, urls))
    }
}
