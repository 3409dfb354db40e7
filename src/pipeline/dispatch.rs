//! Request orchestration.
//!
//! # State machine per request
//! ```text
//! Start → Optimized ─┬─ fresh cache entry ──────────────→ CacheHit
//!                    ├─ GET already in flight ───────────→ Coalesced → Settled
//!                    └─ otherwise → Dispatching ⇄ Retrying → Succeeded | Failed
//! ```
//!
//! Dispatching runs in its own task. On success the response is admitted to
//! the cache (if cacheable), a metric is recorded, then the pending
//! registration is released. On failure a metric is recorded, the
//! registration is released and the failure is mapped to [`ErrorKind`].
//!
//! The pipeline only sends `If-None-Match` on its own when it holds the
//! expired body that token describes. A 304 is then answered with that body
//! and the entry is admitted again with a fresh TTL.
//!
//! Private requests, and GETs where the caller set its own `If-None-Match`,
//! skip the cache and the registry entirely. The latter get a 304 as is.
//!
//! [`ErrorKind`]: crate::pipeline::ErrorKind

use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use futures_util::future::{join_all, FutureExt};
use http::header::{HeaderValue, IF_NONE_MATCH};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{should_cache, ttl_for, CacheStats, CacheStore, MemoryValidatorStore, ValidatorStore};
use crate::config::PipelineConfig;
use crate::dedup::{Coalesced, DispatchOutcome, PendingGuard, PendingRequestRegistry, SharedDispatch};
use crate::observability::metrics;
use crate::observability::{MetricsRecorder, RequestMetric};
use crate::pipeline::error::{ErrorKind, PipelineError};
use crate::request::{optimize, Method, RequestDescriptor, RequestKey, ResponseSnapshot};
use crate::resilience::{retry_plan_for, timeout_for, RetryPlan};
use crate::transport::{Transport, TransportError};

/// Outcome of [`Pipeline::prefetch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefetchReport {
    /// URLs fetched and admitted to the cache.
    pub warmed: Vec<String>,
    /// URLs the cache policy does not accept; never dispatched.
    pub skipped: Vec<String>,
    pub failed: Vec<PrefetchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefetchFailure {
    pub url: String,
    pub kind: ErrorKind,
    pub message: String,
}

struct Inner {
    config: ArcSwap<PipelineConfig>,
    cache: CacheStore,
    pending: PendingRequestRegistry,
    recorder: MetricsRecorder,
    validators: Arc<dyn ValidatorStore>,
    transport: Arc<dyn Transport>,
}

/// Caching, coalescing, retrying request pipeline.
///
/// Cheap to clone; clones share the same cache, registry and metrics. Build
/// one at startup and hand clones to whoever needs to send requests.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// Create a pipeline with an in-memory validator store.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_validators(config, transport, Arc::new(MemoryValidatorStore::default()))
    }

    pub fn with_validators(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
        validators: Arc<dyn ValidatorStore>,
    ) -> Self {
        let cache = CacheStore::new(config.cache.max_entries);
        let recorder = MetricsRecorder::new(
            config.metrics.max_records,
            std::time::Duration::from_millis(config.metrics.slow_request_threshold_ms),
        );

        Self {
            inner: Arc::new(Inner {
                config: ArcSwap::from_pointee(config),
                cache,
                pending: PendingRequestRegistry::new(),
                recorder,
                validators,
                transport,
            }),
        }
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<PipelineConfig> {
        self.inner.config.load_full()
    }

    /// Swap in a new configuration. In-flight dispatches keep the snapshot
    /// they started with.
    pub fn reload(&self, config: PipelineConfig) {
        self.inner.cache.set_max_entries(config.cache.max_entries);
        self.inner.recorder.reconfigure(
            config.metrics.max_records,
            std::time::Duration::from_millis(config.metrics.slow_request_threshold_ms),
        );
        self.inner.config.store(Arc::new(config));
        tracing::info!("Pipeline configuration reloaded");
    }

    /// Send a request through the pipeline.
    pub async fn dispatch(&self, request: RequestDescriptor) -> DispatchOutcome {
        let config = self.inner.config.load_full();
        let caller_conditional = request.headers().contains_key(IF_NONE_MATCH);
        let request = optimize(request, &config.optimizer, self.inner.validators.as_ref());
        let key = request.key();

        if request.method() != Method::Get || request.is_private() || caller_conditional {
            let request = if caller_conditional {
                request
            } else {
                with_validator_of(request, None)
            };
            return self.spawn_dispatch(request, key, false, None, config, None).await;
        }

        let cacheable = should_cache(&request, &config.cache);
        if cacheable {
            if let Some(hit) = self.inner.cache.lookup(&key) {
                metrics::record_cache_hit();
                tracing::debug!(key = %key, "Cache hit");
                return Ok(hit);
            }
            metrics::record_cache_miss();
        }

        let stored = cacheable.then(|| self.inner.cache.stale(&key)).flatten();
        let request = with_validator_of(request, stored.as_ref());

        // No await between the lookup above and the registration below.
        let coalesced = self.inner.pending.coalesce(key.clone(), |guard| {
            self.spawn_dispatch(request, key, cacheable, stored, config, Some(guard))
        });
        if let Coalesced::Joined(_) = &coalesced {
            metrics::record_coalesced();
            tracing::debug!("Joined in-flight dispatch");
        }
        coalesced.into_handle().await
    }

    /// Like [`dispatch`](Self::dispatch), but stops waiting when `cancel`
    /// fires. The dispatch itself keeps running for any other observers and
    /// still records its metric and releases its registration.
    pub async fn dispatch_with_cancel(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        let url = request.url().to_string();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%url, "Caller cancelled");
                Err(PipelineError::cancelled())
            }
            outcome = self.dispatch(request) => outcome,
        }
    }

    /// Warm the cache with GETs for every URL the cache policy accepts.
    pub async fn prefetch<I, S>(&self, urls: I) -> PrefetchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = self.config();
        let mut report = PrefetchReport::default();
        let mut fetches = Vec::new();

        for url in urls {
            let request = RequestDescriptor::get(url);
            if should_cache(&request, &config.cache) {
                fetches.push(async move {
                    let url = request.url().to_string();
                    (url, self.dispatch(request).await)
                });
            } else {
                report.skipped.push(request.url().to_string());
            }
        }

        for (url, outcome) in join_all(fetches).await {
            match outcome {
                Ok(_) => report.warmed.push(url),
                Err(e) => report.failed.push(PrefetchFailure {
                    url,
                    kind: e.kind(),
                    message: e.message().to_string(),
                }),
            }
        }

        tracing::info!(
            warmed = report.warmed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Prefetch complete"
        );
        report
    }

    /// Empty the cache and forget in-flight registrations.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        self.inner.pending.clear();
        tracing::info!("Cache cleared");
    }

    /// Remove expired cache entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.cache.purge_expired()
    }

    /// Completed request records, oldest first.
    pub fn metrics(&self) -> Vec<RequestMetric> {
        self.inner.recorder.all()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Number of distinct requests currently in flight through the registry.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    fn spawn_dispatch(
        &self,
        request: RequestDescriptor,
        key: RequestKey,
        cacheable: bool,
        stored: Option<ResponseSnapshot>,
        config: Arc<PipelineConfig>,
        guard: Option<PendingGuard>,
    ) -> SharedDispatch {
        let inner = self.inner.clone();
        let dispatch_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "dispatch",
            %dispatch_id,
            method = %request.method(),
            url = %request.url()
        );

        let task = tokio::spawn(
            async move {
                // Dropped after the outcome is recorded: releases the registration.
                let _guard = guard;
                inner.execute(request, key, cacheable, stored, config).await
            }
            .instrument(span),
        );

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Dispatch task ended without an outcome");
                    Err(PipelineError::aborted())
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn execute(
        &self,
        request: RequestDescriptor,
        key: RequestKey,
        cacheable: bool,
        stored: Option<ResponseSnapshot>,
        config: Arc<PipelineConfig>,
    ) -> DispatchOutcome {
        let deadline = timeout_for(&request, &config.timeouts);
        let plan = retry_plan_for(&request, &config.retries);
        let started_at = SystemTime::now();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(deadline, self.send_with_retries(&request, &plan)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(failure)) => Err(PipelineError::from_transport(failure)),
            Err(_) => {
                metrics::record_timeout();
                Err(PipelineError::timeout(deadline))
            }
        };
        let elapsed = started.elapsed();
        let method = request.method().as_str();

        match outcome {
            Ok(response) => {
                let wire_status = response.status();
                let response = match stored {
                    Some(stored) if wire_status == 304 => {
                        tracing::debug!("Upstream confirmed stored response");
                        stored.revalidated(&response)
                    }
                    _ => response,
                };
                let fresh = (200..300).contains(&response.status());
                if cacheable && fresh {
                    self.cache.admit(key, response.clone(), ttl_for(&request, &config.cache));
                }
                if fresh {
                    self.remember_validator(&request, &response, &config);
                }
                self.recorder
                    .record(&request, started_at, elapsed, Some(wire_status), response.size());
                metrics::record_request(method, wire_status.to_string(), elapsed);
                tracing::debug!(status = wire_status, elapsed_ms = elapsed.as_millis() as u64, "Dispatch succeeded");
                Ok(response)
            }
            Err(error) => {
                self.recorder.record(&request, started_at, elapsed, error.status(), 0);
                let label = match error.status() {
                    Some(status) => status.to_string(),
                    None => format!("{:?}", error.kind()).to_lowercase(),
                };
                metrics::record_request(method, label, elapsed);
                tracing::warn!(
                    kind = ?error.kind(),
                    status = ?error.status(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Dispatch failed"
                );
                Err(error)
            }
        }
    }

    /// Attempt loop. Returns the first successful response, or the last
    /// failure once it is not retryable or the budget is spent.
    async fn send_with_retries(
        &self,
        request: &RequestDescriptor,
        plan: &RetryPlan,
    ) -> Result<ResponseSnapshot, TransportError> {
        let mut attempt = 0;
        loop {
            let failure = match self.transport.send(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => TransportError::Status {
                    status: response.status(),
                    body_len: response.size(),
                },
                Err(e) => e,
            };

            if !plan.should_retry(attempt, &failure) {
                return Err(failure);
            }

            let delay = plan.delay_after(attempt);
            tracing::info!(attempt, delay = ?delay, error = %failure, "Retrying request");
            metrics::record_retry(
                failure
                    .status()
                    .map_or_else(|| "network".to_string(), |s| s.to_string()),
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn remember_validator(
        &self,
        request: &RequestDescriptor,
        response: &ResponseSnapshot,
        config: &PipelineConfig,
    ) {
        if request.method() != Method::Get || !request.path().starts_with(&config.optimizer.api_prefix) {
            return;
        }
        if let Some(etag) = response.etag() {
            self.validators.put(&request.normalized_url(), etag);
        }
    }
}

/// Set `If-None-Match` to the ETag of the stored body, or drop it when
/// there is no body a 304 could stand for.
fn with_validator_of(request: RequestDescriptor, stored: Option<&ResponseSnapshot>) -> RequestDescriptor {
    let token = stored
        .and_then(ResponseSnapshot::etag)
        .and_then(|etag| HeaderValue::from_str(etag).ok());
    if token.is_none() && !request.headers().contains_key(IF_NONE_MATCH) {
        return request;
    }

    let mut headers = request.headers().clone();
    match token {
        Some(token) => {
            headers.insert(IF_NONE_MATCH, token);
        }
        None => {
            headers.remove(IF_NONE_MATCH);
        }
    }
    request.with_headers(headers)
}
