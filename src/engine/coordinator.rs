//! Update coordination: when to reuse a cached banner, when to resolve a new
//! one, and how concurrent triggers for the same view share one resolution.
//!
//! # Per-key lifecycle
//!
//! ```text
//! Idle ──trigger──▶ Resolving ──success──▶ Settled (cache written) ──▶ Idle
//!                       │
//!                       └──failure──▶ Idle (cache untouched)
//! ```
//!
//! A trigger arriving while its key is `Resolving` joins the in-flight
//! resolution instead of starting another. In-flight work is tracked as a
//! map from key to a shared future; the reuse decision and the in-flight
//! registration happen under one lock with no await in between.
//!
//! Resolutions are spawned, so they finish and write the cache even when
//! every caller has gone away. Each carries a generation number, and only
//! the generation still registered as in flight for its key may write. A
//! newer resolution or an invalidation replaces or removes that
//! registration, so late results are dropped.
//!
//! Every settlement, including misses and failures, is remembered for the
//! debounce window so a burst of triggers costs one provider request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, join_all};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cache::{BannerCache, EntryKind, make_key};
use crate::input::{self, InputDescriptor};
use crate::pipeline::ResolutionPipeline;
use crate::providers::RateLimiter;
use crate::{Result, VexillumError, telemetry};

/// Coordinator tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Window after a settlement in which triggers for the same value reuse
    /// its outcome.
    /// Default: 50ms.
    #[serde(with = "crate::cache::millis")]
    pub debounce: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
        }
    }
}

/// How a trigger treats an existing cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Always resolve (frontmatter edit, explicit refresh).
    #[default]
    FullUpdate,
    /// Reuse any live entry; resolve only if there is none (file open,
    /// resize, layout change).
    EnsureVisibility,
    /// Pick a new random image and cache it with the short shuffle TTL.
    ShuffleUpdate,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::FullUpdate => "full",
            UpdateMode::EnsureVisibility => "ensure_visibility",
            UpdateMode::ShuffleUpdate => "shuffle",
        }
    }
}

/// Observable per-key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Idle,
    Resolving,
}

/// One trigger from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct BannerRequest {
    pub document_path: String,
    /// Identity of the pane showing the document.
    pub view_id: String,
    /// Raw frontmatter value.
    pub value: Value,
    /// Whether the document has shuffle enabled.
    pub shuffle: bool,
    pub mode: UpdateMode,
}

impl BannerRequest {
    pub fn new(document_path: impl Into<String>, view_id: impl Into<String>, value: Value) -> Self {
        Self {
            document_path: document_path.into(),
            view_id: view_id.into(),
            value,
            shuffle: false,
            mode: UpdateMode::default(),
        }
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Outcome of refreshing one view of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutcome {
    pub view_id: String,
    pub result: Result<Option<String>>,
}

type SharedResolution = Shared<BoxFuture<'static, Result<Option<String>>>>;

struct InFlight {
    generation: u64,
    document_path: String,
    source: String,
    future: SharedResolution,
}

#[derive(Clone)]
struct OpenView {
    value: Value,
    shuffle: bool,
}

/// Outcome of the last resolution for a key.
struct Settlement {
    document_path: String,
    source: String,
    at: Instant,
    outcome: Result<Option<String>>,
}

#[derive(Default)]
struct Coordination {
    in_flight: HashMap<String, InFlight>,
    /// Settlements younger than the debounce window.
    recent: HashMap<String, Settlement>,
    /// document path → view id → last seen configuration.
    views: HashMap<String, HashMap<String, OpenView>>,
}

struct Job {
    key: String,
    document_path: String,
    value: Value,
    source: String,
    kind: EntryKind,
    allow_fallback: bool,
    generation: u64,
}

/// Shared state behind [`BannerEngine`].
pub(crate) struct EngineState {
    cache: BannerCache,
    limiter: Arc<RateLimiter>,
    pipeline: ResolutionPipeline,
    config: CoordinatorConfig,
    coordination: Mutex<Coordination>,
    next_generation: AtomicU64,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl EngineState {
    fn lock(&self) -> std::sync::MutexGuard<'_, Coordination> {
        self.coordination.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn run(self: Arc<Self>, job: Job) -> Result<Option<String>> {
        let outcome = match self.pipeline.classify_detached(&job.value).await {
            Ok(descriptor) => {
                debug!(key = %job.key, kind = descriptor.kind.as_str(), "resolving banner");
                self.pipeline
                    .resolve(&descriptor, &job.document_path, job.allow_fallback)
                    .await
            }
            Err(e) => Err(e),
        };
        self.settle(&job, &outcome);
        outcome
    }

    fn settle(&self, job: &Job, outcome: &Result<Option<String>>) {
        let mut state = self.lock();
        let current = state
            .in_flight
            .get(&job.key)
            .is_some_and(|f| f.generation == job.generation);
        if current {
            state.in_flight.remove(&job.key);
            let now = Instant::now();
            let window = self.config.debounce;
            state
                .recent
                .retain(|_, s| now.duration_since(s.at) < window);
            state.recent.insert(
                job.key.clone(),
                Settlement {
                    document_path: job.document_path.clone(),
                    source: job.source.clone(),
                    at: now,
                    outcome: outcome.clone(),
                },
            );
        } else {
            debug!(key = %job.key, "dropping superseded banner resolution");
        }

        let label = match outcome {
            Ok(Some(image)) => {
                if current {
                    self.cache.put(
                        job.key.clone(),
                        job.document_path.clone(),
                        image.clone(),
                        job.source.clone(),
                        job.kind,
                    );
                }
                "image"
            }
            Ok(None) => {
                debug!(key = %job.key, "no banner image found");
                "none"
            }
            Err(e) => {
                warn!(key = %job.key, error = %e, retryable = e.is_transient(), "banner resolution failed");
                "error"
            }
        };
        metrics::counter!(telemetry::RESOLUTIONS_TOTAL, "outcome" => label).increment(1);
    }

    /// Stop results of in-flight work for `keys` from reaching the cache
    /// and forget their recent settlements.
    fn supersede(state: &mut Coordination, keys: &[String]) {
        for key in keys {
            state.in_flight.remove(key);
            state.recent.remove(key);
        }
    }

    /// What a trigger for `key` can reuse without resolving, if anything.
    fn reusable(
        &self,
        state: &Coordination,
        key: &str,
        source: &str,
        mode: UpdateMode,
    ) -> Option<Result<Option<String>>> {
        if mode == UpdateMode::EnsureVisibility
            && let Some(entry) = self.cache.get(key).filter(|e| e.source == source)
        {
            return Some(Ok(Some(entry.image_ref)));
        }
        state
            .recent
            .get(key)
            .filter(|s| s.source == source && s.at.elapsed() < self.config.debounce)
            .map(|s| s.outcome.clone())
    }
}

/// The banner engine: cache, rate limiter, providers and vault behind one
/// handle.
///
/// Cheap to clone; clones share all state. Build one per host plugin
/// instance with [`Vexillum::builder()`](crate::Vexillum::builder) and call
/// [`shutdown`](Self::shutdown) on unload.
#[derive(Clone)]
pub struct BannerEngine {
    inner: Arc<EngineState>,
}

impl BannerEngine {
    pub(crate) fn new(
        cache: BannerCache,
        limiter: Arc<RateLimiter>,
        pipeline: ResolutionPipeline,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineState {
                cache,
                limiter,
                pipeline,
                config,
                coordination: Mutex::new(Coordination::default()),
                next_generation: AtomicU64::new(0),
                sweeper: Mutex::new(None),
            }),
        }
    }

    pub fn cache(&self) -> &BannerCache {
        &self.inner.cache
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Classify a raw banner value against the engine's vault.
    pub fn classify(&self, value: &Value) -> InputDescriptor {
        self.inner.pipeline.classify(value)
    }

    /// Resolve the banner for one view of a document.
    ///
    /// Returns the image reference to render, `Ok(None)` when there is no
    /// image to show (nothing configured, nothing found, unreadable file),
    /// or `Err` when a provider request failed in transport. A failure
    /// leaves any previously cached banner in place.
    #[instrument(
        skip(self, request),
        fields(document = %request.document_path, view = %request.view_id, mode = request.mode.as_str())
    )]
    pub async fn resolve_banner(&self, request: &BannerRequest) -> Result<Option<String>> {
        let document = request.document_path.trim();
        if document.is_empty() {
            debug!("no active document, skipping banner update");
            return Ok(None);
        }
        let Some(source) = input::normalize(&request.value).filter(|s| !s.is_empty()) else {
            debug!("no usable banner value, skipping banner update");
            return Ok(None);
        };

        let key = make_key(document, &request.view_id, request.shuffle);
        let resolution = {
            let mut state = self.inner.lock();
            state
                .views
                .entry(document.to_string())
                .or_default()
                .insert(
                    request.view_id.clone(),
                    OpenView {
                        value: request.value.clone(),
                        shuffle: request.shuffle,
                    },
                );

            let joinable = state
                .in_flight
                .get(&key)
                .filter(|flight| flight.source == source)
                .map(|flight| flight.future.clone());
            match joinable {
                Some(future) => {
                    metrics::counter!(telemetry::COALESCED_TOTAL).increment(1);
                    debug!(key = %key, "joining in-flight banner resolution");
                    future
                }
                None => {
                    if let Some(outcome) = self.inner.reusable(&state, &key, &source, request.mode) {
                        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "mode" => request.mode.as_str())
                            .increment(1);
                        return outcome;
                    }
                    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "mode" => request.mode.as_str())
                        .increment(1);

                    let generation = self.inner.next_generation();
                    let future = self.spawn(Job {
                        key: key.clone(),
                        document_path: document.to_string(),
                        value: request.value.clone(),
                        source: source.clone(),
                        kind: if request.shuffle || request.mode == UpdateMode::ShuffleUpdate {
                            EntryKind::Shuffled
                        } else {
                            EntryKind::Static
                        },
                        allow_fallback: request.mode != UpdateMode::ShuffleUpdate,
                        generation,
                    });
                    state.in_flight.insert(
                        key,
                        InFlight {
                            generation,
                            document_path: document.to_string(),
                            source,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };
        resolution.await
    }

    /// Re-resolve every open view of a document with a new configuration
    /// value, e.g. after a frontmatter edit in one of them.
    pub async fn refresh_document(
        &self,
        document_path: &str,
        value: &Value,
        mode: UpdateMode,
    ) -> Vec<ViewOutcome> {
        let views: Vec<(String, bool)> = {
            let state = self.inner.lock();
            state
                .views
                .get(document_path)
                .map(|views| views.iter().map(|(id, v)| (id.clone(), v.shuffle)).collect())
                .unwrap_or_default()
        };

        let requests: Vec<BannerRequest> = views
            .into_iter()
            .map(|(view_id, shuffle)| {
                BannerRequest::new(document_path, view_id, value.clone())
                    .shuffle(shuffle)
                    .mode(mode)
            })
            .collect();

        join_all(requests.iter().map(|request| async move {
            ViewOutcome {
                view_id: request.view_id.clone(),
                result: self.resolve_banner(request).await,
            }
        }))
        .await
    }

    /// Re-run every open view of every document with its last known
    /// configuration, e.g. after settings changed.
    pub async fn refresh_all(&self, mode: UpdateMode) -> Vec<(String, ViewOutcome)> {
        let requests: Vec<BannerRequest> = {
            let state = self.inner.lock();
            state
                .views
                .iter()
                .flat_map(|(document, views)| {
                    views.iter().map(move |(view_id, view)| {
                        BannerRequest::new(document.clone(), view_id.clone(), view.value.clone())
                            .shuffle(view.shuffle)
                            .mode(mode)
                    })
                })
                .collect()
        };

        join_all(requests.iter().map(|request| async move {
            (
                request.document_path.clone(),
                ViewOutcome {
                    view_id: request.view_id.clone(),
                    result: self.resolve_banner(request).await,
                },
            )
        }))
        .await
    }

    /// Forget a closed view and its cache entries.
    pub fn close_view(&self, document_path: &str, view_id: &str) {
        let keys = [
            make_key(document_path, view_id, false),
            make_key(document_path, view_id, true),
        ];
        let mut state = self.inner.lock();
        if let Some(views) = state.views.get_mut(document_path) {
            views.remove(view_id);
            if views.is_empty() {
                state.views.remove(document_path);
            }
        }
        EngineState::supersede(&mut state, &keys);
        for key in &keys {
            self.inner.cache.invalidate(key);
        }
    }

    /// Drop everything known about a document (deleted, or its identity
    /// changed). Returns the number of cache entries removed.
    pub fn invalidate_document(&self, document_path: &str) -> usize {
        let mut state = self.inner.lock();
        state.views.remove(document_path);
        let mut keys = self.inner.cache.keys_for_document(document_path);
        keys.extend(
            state
                .in_flight
                .iter()
                .filter(|(_, f)| f.document_path == document_path)
                .map(|(k, _)| k.clone()),
        );
        keys.extend(
            state
                .recent
                .iter()
                .filter(|(_, s)| s.document_path == document_path)
                .map(|(k, _)| k.clone()),
        );
        EngineState::supersede(&mut state, &keys);
        let removed = self.inner.cache.invalidate_document(document_path);
        debug!(document = document_path, removed, "invalidated document banners");
        removed
    }

    /// Move open views to a renamed document and drop the old path's
    /// entries. Views re-resolve on their next trigger.
    pub fn rename_document(&self, old_path: &str, new_path: &str) {
        let moved = self.inner.lock().views.remove(old_path);
        self.invalidate_document(old_path);
        if let Some(views) = moved {
            self.inner
                .lock()
                .views
                .entry(new_path.to_string())
                .or_default()
                .extend(views);
        }
    }

    /// Clear cached state. Without `force` only stale banners go; with it
    /// everything does (settings saved, plugin unloading), including
    /// encoded local images and the rate limiter's history. Returns the
    /// number of banner entries removed.
    pub fn clear_all_caches(&self, force: bool) -> usize {
        let removed = self.inner.cache.sweep(force);
        if force {
            let mut state = self.inner.lock();
            state.in_flight.clear();
            state.recent.clear();
            self.inner.pipeline.clear();
            self.inner.limiter.reset();
        }
        removed
    }

    /// Periodically sweep stale entries. Replaces any previous sweeper.
    ///
    /// Requires a tokio runtime context.
    pub fn spawn_sweeper(&self, interval: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.cache.sweep(false);
            }
        });
        let previous = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Tear down: stop the sweeper, forget open views, clear everything.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        self.inner.lock().views.clear();
        self.clear_all_caches(true);
    }

    /// Whether a resolution is currently running for this view.
    pub fn state(&self, document_path: &str, view_id: &str, shuffle: bool) -> ResolutionState {
        let key = make_key(document_path, view_id, shuffle);
        if self.inner.lock().in_flight.contains_key(&key) {
            ResolutionState::Resolving
        } else {
            ResolutionState::Idle
        }
    }

    /// View ids currently showing a document.
    pub fn open_views(&self, document_path: &str) -> Vec<String> {
        let state = self.inner.lock();
        let mut views: Vec<String> = state
            .views
            .get(document_path)
            .map(|views| views.keys().cloned().collect())
            .unwrap_or_default();
        views.sort();
        views
    }

    fn spawn(&self, job: Job) -> SharedResolution {
        let handle = tokio::spawn(self.inner.clone().run(job));
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(VexillumError::Task(e.to_string())))
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vexillum;

    fn engine(dir: &tempfile::TempDir) -> BannerEngine {
        Vexillum::builder().fs_vault(dir.path()).build().unwrap()
    }

    fn url_request(i: usize) -> BannerRequest {
        BannerRequest::new(
            format!("d{i}.md"),
            "v1",
            Value::String(format!("https://example.com/{i}.jpg")),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn settlements_outside_the_window_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        for i in 0..200 {
            engine.resolve_banner(&url_request(i)).await.unwrap();
        }
        assert_eq!(engine.inner.lock().recent.len(), 200);

        tokio::time::advance(Duration::from_millis(100)).await;
        engine.resolve_banner(&url_request(200)).await.unwrap();

        let state = engine.inner.lock();
        assert_eq!(state.recent.len(), 1);
        assert!(state.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_forgets_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        for i in 0..200 {
            engine.resolve_banner(&url_request(i)).await.unwrap();
        }
        engine.shutdown();

        let state = engine.inner.lock();
        assert!(state.recent.is_empty());
        assert!(state.in_flight.is_empty());
        assert!(state.views.is_empty());
        assert!(engine.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_forgets_settlements_for_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir);
        engine.resolve_banner(&url_request(1)).await.unwrap();
        engine.resolve_banner(&url_request(2)).await.unwrap();

        engine.invalidate_document("d1.md");

        let state = engine.inner.lock();
        assert!(!state.recent.contains_key(&make_key("d1.md", "v1", false)));
        assert!(state.recent.contains_key(&make_key("d2.md", "v1", false)));
    }
}
