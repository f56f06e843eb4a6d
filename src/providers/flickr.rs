//! Flickr photo search client.
//!
//! See: <https://www.flickr.com/services/api/flickr.photos.search.html>
//!
//! Flickr returns photo identifiers rather than URLs; the image URL is
//! assembled from server, id and secret, with a size suffix choosing the
//! rendition. The search endpoint has no orientation filter, so the
//! orientation preference is ignored.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::http::{get_json, pick_random};
use super::rate_limit::RateLimiter;
use super::traits::{ImageProvider, ImageQuery, ImageSize, ProviderKind};
use crate::Result;

/// Default base URL for the Flickr REST API
const DEFAULT_BASE_URL: &str = "https://api.flickr.com/services/rest";

/// Host serving photo files.
const STATIC_HOST: &str = "https://live.staticflickr.com";

const MAX_PER_PAGE: u32 = 500;

#[derive(Clone)]
pub struct FlickrProvider {
    http: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl FlickrProvider {
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

/// Flickr size suffixes: w = 400px, c = 800px, b = 1024px on the long edge.
fn size_suffix(size: ImageSize) -> &'static str {
    match size {
        ImageSize::Small => "w",
        ImageSize::Medium => "c",
        ImageSize::Large => "b",
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    stat: String,
    photos: Option<PhotoPage>,
}

#[derive(Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photo: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    id: String,
    server: String,
    secret: String,
}

impl Photo {
    fn url(&self, size: ImageSize) -> String {
        format!(
            "{STATIC_HOST}/{}/{}_{}_{}.jpg",
            self.server,
            self.id,
            self.secret,
            size_suffix(size)
        )
    }
}

#[async_trait]
impl ImageProvider for FlickrProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Flickr
    }

    async fn fetch(&self, api_key: &str, query: &ImageQuery) -> Result<Option<String>> {
        let per_page = query.result_count.clamp(1, MAX_PER_PAGE).to_string();
        let request = self.http.get(format!("{}/", self.base_url)).query(&[
            ("method", "flickr.photos.search"),
            ("api_key", api_key),
            ("text", query.keyword.as_str()),
            ("format", "json"),
            ("nojsoncallback", "1"),
            ("sort", "relevance"),
            ("content_type", "1"),
            ("media", "photos"),
            ("safe_search", "1"),
            ("per_page", per_page.as_str()),
        ]);

        let Some(body) = get_json::<SearchResponse>(&self.limiter, "flickr", request).await? else {
            return Ok(None);
        };

        // Flickr reports API failures (bad key, ...) with HTTP 200.
        if body.stat != "ok" {
            warn!(provider = "flickr", stat = %body.stat, "image search failed");
            return Ok(None);
        }

        let urls: Vec<String> = body
            .photos
            .map(|page| page.photo.iter().map(|p| p.url(query.size)).collect())
            .unwrap_or_default();
        Ok(pick_random("flickr", &query.keyword, urls))
    }
}
