//! Shared request plumbing for the provider adapters.

use rand::seq::SliceRandom;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use crate::telemetry;
use crate::{Result, VexillumError};

/// Send a rate-limited GET and decode its JSON body.
///
/// Transport failures are errors. A non-2xx status or a body that does not
/// decode is a soft miss (`Ok(None)`).
pub(crate) async fn get_json<T: DeserializeOwned>(
    limiter: &RateLimiter,
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Option<T>> {
    let response = match limiter.schedule(|| request.send()).await {
        Ok(response) => response,
        Err(e) => {
            record(provider, "error");
            return Err(e.into());
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = VexillumError::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        };
        warn!(provider, error = %err, retryable = err.is_transient(), "image search returned an error status");
        record(provider, "miss");
        return Ok(None);
    }

    match response.json::<T>().await {
        Ok(body) => {
            record(provider, "ok");
            Ok(Some(body))
        }
        Err(e) => {
            warn!(provider, error = %e, "could not decode image search response");
            record(provider, "miss");
            Ok(None)
        }
    }
}

/// Pick one of `urls` at random.
pub(crate) fn pick_random(provider: &'static str, keyword: &str, urls: Vec<String>) -> Option<String> {
    let picked = urls.choose(&mut rand::thread_rng()).cloned();
    if picked.is_none() {
        debug!(provider, keyword, "image search returned no results");
    }
    picked
}

fn record(provider: &'static str, status: &'static str) {
    metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL,
        "provider" => provider,
        "status" => status,
    )
    .increment(1);
}
