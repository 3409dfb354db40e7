//! Cache admission rules.

use std::time::Duration;

use crate::config::CacheConfig;
use crate::request::{Method, RequestDescriptor};
use crate::routing::{longest_prefix, matches_any_prefix};

/// True iff the request is a GET to an allow-listed endpoint and its URL
/// carries no time-varying marker.
pub fn should_cache(request: &RequestDescriptor, config: &CacheConfig) -> bool {
    if request.method() != Method::Get {
        return false;
    }
    if config
        .no_cache_markers
        .iter()
        .any(|marker| request.url().contains(marker.as_str()))
    {
        return false;
    }
    matches_any_prefix(&request.path(), &config.cacheable_endpoint_prefixes)
}

/// Lifetime for a cached response to this request.
pub fn ttl_for(request: &RequestDescriptor, config: &CacheConfig) -> Duration {
    longest_prefix(&config.ttl_by_endpoint, &request.path())
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or_else(|| config.default_ttl())
}
