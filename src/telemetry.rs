//! Telemetry metric name constants.
//!
//! Centralised metric names for vexillum operations. Hosts install their
//! own `metrics` recorder; without a recorder installed, all metric calls
//! are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `vexillum_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `provider`: image provider name (e.g. "pexels", "unsplash")
//! - `mode`: update mode: "full", "ensure_visibility" or "shuffle"
//! - `outcome`: "image", "none" or "error"
//! - `status`: provider request outcome: "ok", "miss" or "error"

/// Cache lookups that produced a reusable banner.
///
/// Labels: `mode`.
pub const CACHE_HITS_TOTAL: &str = "vexillum_cache_hits_total";

/// Cache lookups that required a resolution.
///
/// Labels: `mode`.
pub const CACHE_MISSES_TOTAL: &str = "vexillum_cache_misses_total";

/// Triggers that joined an in-flight resolution instead of starting one.
pub const COALESCED_TOTAL: &str = "vexillum_coalesced_total";

/// Completed resolutions.
///
/// Labels: `outcome`.
pub const RESOLUTIONS_TOTAL: &str = "vexillum_resolutions_total";

/// Outbound image-search requests.
///
/// Labels: `provider`, `status`.
pub const PROVIDER_REQUESTS_TOTAL: &str = "vexillum_provider_requests_total";

/// Entries evicted from the banner cache because the size bound was hit.
pub const EVICTIONS_TOTAL: &str = "vexillum_evictions_total";
