//! Timeout policy.
//!
//! The resolved duration bounds the whole dispatch: every attempt and every
//! backoff sleep between attempts count against it.

use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::request::RequestDescriptor;
use crate::routing::longest_prefix;

/// Total time budget for dispatching `request`.
pub fn timeout_for(request: &RequestDescriptor, config: &TimeoutConfig) -> Duration {
    let ms = longest_prefix(&config.by_endpoint, &request.path())
        .copied()
        .unwrap_or(config.default_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_timeouts() {
        let config = TimeoutConfig::default();
        let timeout = |url: &str| timeout_for(&RequestDescriptor::get(url), &config);

        assert_eq!(timeout("/api/upload/fotos"), Duration::from_secs(60));
        assert_eq!(timeout("/api/reportes/ocupacion"), Duration::from_secs(30));
        assert_eq!(timeout("/api/busqueda?q=playa"), Duration::from_secs(15));
        assert_eq!(timeout("/api/hoteles"), Duration::from_secs(10));
    }
}
