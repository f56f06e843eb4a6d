//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;

use vexillum::{
    BannerCache, BannerRequest, CacheConfig, EntryKind, ImageProvider, ImageQuery,
    PexelsProvider, ProviderKind, RateLimitConfig, RateLimiter, Result, UpdateMode, Vault,
    VaultFile, Vexillum, VexillumError, telemetry,
};

// ============================================================================
// Mocks
// ============================================================================

struct EmptyVault;

#[async_trait]
impl Vault for EmptyVault {
    fn get_file(&self, _path: &str) -> Option<VaultFile> {
        None
    }

    fn resolve_link(&self, _link: &str, _context_path: &str) -> Option<String> {
        None
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        Err(VexillumError::NotFound(path.to_string()))
    }
}

struct SlowProvider;

#[async_trait]
impl ImageProvider for SlowProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pexels
    }

    async fn fetch(&self, _api_key: &str, query: &ImageQuery) -> Result<Option<String>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Some(format!("https://img/{}", query.keyword)))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for `name` carrying label `label = value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Run async code on a current-thread runtime inside a local recorder
/// scope, so spawned resolutions record into the same recorder.
fn with_recorder<F, Fut>(f: F) -> SnapshotVec
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(f());
    });
    snapshotter.snapshot().into_vec()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn coordinator_records_hits_misses_and_coalescing() {
    let snapshot = with_recorder(|| async {
        let engine = Vexillum::builder()
            .vault(Arc::new(EmptyVault))
            .provider(Arc::new(SlowProvider))
            .pexels("k")
            .rate_limit(RateLimitConfig::new().min_interval(Duration::ZERO))
            .build()
            .unwrap();

        let full = BannerRequest::new("a.md", "v1", json!("cats"));
        let ensure = full.clone().mode(UpdateMode::EnsureVisibility);

        let (a, b) = tokio::join!(engine.resolve_banner(&full), engine.resolve_banner(&full));
        assert_eq!(a, b);
        engine.resolve_banner(&ensure).await.unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::COALESCED_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_HITS_TOTAL, "mode", "ensure_visibility"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::RESOLUTIONS_TOTAL, "outcome", "image"),
        1
    );
}

#[test]
fn provider_transport_failure_is_counted() {
    let snapshot = with_recorder(|| async {
        let provider = PexelsProvider::with_base_url(
            reqwest::Client::new(),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            "http://127.0.0.1:1",
        );
        let result = provider.fetch("k", &ImageQuery::new("cats")).await;
        assert!(result.is_err());
    });

    assert_eq!(
        counter_with_label(&snapshot, telemetry::PROVIDER_REQUESTS_TOTAL, "status", "error"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::PROVIDER_REQUESTS_TOTAL, "provider", "pexels"),
        1
    );
}

#[test]
fn evictions_are_counted() {
    let snapshot = with_recorder(|| async {
        let cache = BannerCache::new(CacheConfig::new().max_entries(2));
        for i in 0..5 {
            let doc = format!("{i}.md");
            cache.put(doc.clone(), doc, "img", "src", EntryKind::Static);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    assert_eq!(counter_total(&snapshot, telemetry::EVICTIONS_TOTAL), 3);
}

#[test]
fn no_recorder_is_a_no_op() {
    // Without a recorder installed every metric call is silently dropped.
    let cache = BannerCache::new(CacheConfig::new().max_entries(1));
    cache.put("a", "a.md", "img", "src", EntryKind::Static);
    cache.put("b", "b.md", "img", "src", EntryKind::Static);
    assert_eq!(cache.len(), 1);
}
