//! Prometheus metrics.
//!
//! # Metrics
//! - `pipeline_requests_total` (counter): settled dispatches by method, status
//! - `pipeline_request_duration_seconds` (histogram): dispatch latency
//! - `pipeline_cache_hits_total` / `pipeline_cache_misses_total` (counters)
//! - `pipeline_cache_evictions_total` (counter), `pipeline_cache_entries` (gauge)
//! - `pipeline_coalesced_total` (counter): callers attached to an in-flight dispatch
//! - `pipeline_retries_total`, `pipeline_timeouts_total`, `pipeline_slow_requests_total`
//!
//! All recording goes through the `metrics` facade, so these are no-ops until
//! a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Record a settled dispatch. `status` is the lowercased error kind
/// ("timeout", "networkunavailable") when no HTTP status was received.
pub fn record_request(method: &str, status: String, duration: Duration) {
    metrics::counter!(
        "pipeline_requests_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("pipeline_request_duration_seconds", "method" => method.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_cache_hit() {
    metrics::counter!("pipeline_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("pipeline_cache_misses_total").increment(1);
}

pub fn record_cache_eviction(count: usize) {
    metrics::counter!("pipeline_cache_evictions_total").increment(count as u64);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!("pipeline_cache_entries").set(size as f64);
}

pub fn record_coalesced() {
    metrics::counter!("pipeline_coalesced_total").increment(1);
}

pub fn record_retry(status: String) {
    metrics::counter!("pipeline_retries_total", "reason" => status).increment(1);
}

pub fn record_timeout() {
    metrics::counter!("pipeline_timeouts_total").increment(1);
}

pub fn record_slow_request(method: &str) {
    metrics::counter!("pipeline_slow_requests_total", "method" => method.to_string()).increment(1);
}
