//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the request pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where outgoing requests are sent.
    pub upstream: UpstreamConfig,

    /// Gateway listener settings.
    pub gateway: GatewayConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeout policy.
    pub timeouts: TimeoutConfig,

    /// Retry policy.
    pub retries: RetryConfig,

    /// Request metrics recorder.
    pub metrics: MetricsConfig,

    /// Outbound header optimization.
    pub optimizer: OptimizerConfig,

    /// Conditional-request validator store.
    pub validators: ValidatorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Upstream transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL that relative request URLs are resolved against.
    pub base_url: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            connect_timeout_ms: 5_000,
        }
    }
}

/// Gateway listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body accepted for forwarding, in bytes.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses.
    pub max_entries: usize,

    /// Path prefixes whose GET responses may be cached.
    pub cacheable_endpoint_prefixes: Vec<String>,

    /// Prefix -> TTL in seconds. Longest matching prefix wins.
    pub ttl_by_endpoint: HashMap<String, u64>,

    /// TTL for cacheable endpoints without a specific rule.
    pub default_ttl_secs: u64,

    /// URL fragments marking a request as time-varying (never cached).
    pub no_cache_markers: Vec<String>,

    /// Interval of the expired-entry sweeper. 0 disables it.
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttl_by_endpoint = [
            ("/api/configuracion", 15 * 60),
            ("/api/hoteles", 10 * 60),
            ("/api/usuarios", 5 * 60),
            ("/api/disponibilidad", 2 * 60),
            ("/api/auth/verificar", 30),
        ]
        .into_iter()
        .map(|(prefix, secs)| (prefix.to_string(), secs))
        .collect();

        Self {
            max_entries: 100,
            cacheable_endpoint_prefixes: vec![
                "/api/configuracion".to_string(),
                "/api/hoteles".to_string(),
                "/api/usuarios".to_string(),
                "/api/disponibilidad".to_string(),
                "/api/auth/verificar".to_string(),
                "/api/ciudades".to_string(),
            ],
            ttl_by_endpoint,
            default_ttl_secs: 5 * 60,
            no_cache_markers: vec!["_t=".to_string(), "timestamp=".to_string()],
            sweep_interval_secs: 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time budget for a dispatch (all attempts and backoff), in milliseconds.
    pub default_ms: u64,

    /// Prefix -> timeout in milliseconds. Longest matching prefix wins.
    pub by_endpoint: HashMap<String, u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let by_endpoint = [
            ("/api/upload", 60_000),
            ("/api/reportes", 30_000),
            ("/api/busqueda", 15_000),
        ]
        .into_iter()
        .map(|(prefix, ms)| (prefix.to_string(), ms))
        .collect();

        Self {
            default_ms: 10_000,
            by_endpoint,
        }
    }
}

/// Per-endpoint retry override.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryOverride {
    pub max_retries: u32,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries for idempotent requests without an override.
    pub default_max_retries: u32,

    /// Prefix -> override. Only consulted for idempotent methods.
    pub overrides_by_endpoint: HashMap<String, RetryOverride>,

    /// HTTP statuses treated as transient.
    pub retryable_statuses: Vec<u16>,

    /// Retry idempotent requests after connection-level failures.
    pub retry_network_errors: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let mut overrides_by_endpoint = HashMap::new();
        overrides_by_endpoint.insert("/api/auth".to_string(), RetryOverride { max_retries: 3 });

        Self {
            default_max_retries: 2,
            overrides_by_endpoint,
            retryable_statuses: vec![502, 503, 504],
            retry_network_errors: true,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter: false,
        }
    }
}

/// Request metrics recorder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Number of request records kept (oldest dropped first).
    pub max_records: usize,

    /// Requests slower than this are flagged.
    pub slow_request_threshold_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_records: 100,
            slow_request_threshold_ms: 5_000,
        }
    }
}

/// Outbound header optimization rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Path prefix identifying API calls.
    pub api_prefix: String,

    /// Value for `Accept-Encoding` when the caller set none.
    pub accept_encoding: String,

    /// `Accept` for API calls.
    pub json_accept: String,

    /// `Accept` for image URLs.
    pub image_accept: String,

    /// Extensions treated as images (lowercase, no dot).
    pub image_extensions: Vec<String>,

    /// Extensions treated as long-lived static assets.
    pub static_asset_extensions: Vec<String>,

    /// `Cache-Control` attached to static asset GETs.
    pub static_cache_control: String,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let to_strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            api_prefix: "/api".to_string(),
            accept_encoding: "gzip, deflate, br".to_string(),
            json_accept: "application/json".to_string(),
            image_accept: "image/webp,image/avif,image/*,*/*;q=0.8".to_string(),
            image_extensions: to_strings(&["jpg", "jpeg", "png", "gif", "webp", "avif", "svg"]),
            static_asset_extensions: to_strings(&[
                "js", "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2",
            ]),
            static_cache_control: "public, max-age=31536000, immutable".to_string(),
        }
    }
}

/// Validator (ETag) store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ValidatorConfig {
    /// JSON file the store is loaded from at startup and saved to on shutdown.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes on the gateway.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
