//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. All problems are reported,
//! not just the first.

use thiserror::Error;

use crate::config::schema::PipelineConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: prefix '{prefix}' must start with '/'")]
    BadPrefix { field: &'static str, prefix: String },

    #[error("upstream.base_url '{0}' is not an absolute URL")]
    BadBaseUrl(String),

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("retries.retryable_statuses contains {0}, which is not an HTTP error status")]
    BadStatus(u16),

    #[error("observability.log_format must be 'pretty' or 'json', got '{0}'")]
    BadLogFormat(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if url::Url::parse(&config.upstream.base_url).is_err() {
        errors.push(ValidationError::BadBaseUrl(config.upstream.base_url.clone()));
    }

    let positive = [
        ("cache.max_entries", config.cache.max_entries as u64),
        ("metrics.max_records", config.metrics.max_records as u64),
        ("timeouts.default_ms", config.timeouts.default_ms),
        ("retries.base_delay_ms", config.retries.base_delay_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }
    if config.timeouts.by_endpoint.values().any(|ms| *ms == 0) {
        errors.push(ValidationError::Zero { field: "timeouts.by_endpoint" });
    }

    let prefix_fields = [
        (
            "cache.cacheable_endpoint_prefixes",
            config.cache.cacheable_endpoint_prefixes.iter().collect::<Vec<_>>(),
        ),
        ("cache.ttl_by_endpoint", config.cache.ttl_by_endpoint.keys().collect()),
        ("timeouts.by_endpoint", config.timeouts.by_endpoint.keys().collect()),
        ("retries.overrides_by_endpoint", config.retries.overrides_by_endpoint.keys().collect()),
    ];
    for (field, prefixes) in prefix_fields {
        for prefix in prefixes {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::BadPrefix { field, prefix: prefix.clone() });
            }
        }
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }
    for status in &config.retries.retryable_statuses {
        if !(400..=599).contains(status) {
            errors.push(ValidationError::BadStatus(*status));
        }
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::BadLogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = PipelineConfig::default();
        config.cache.max_entries = 0;
        config.cache.cacheable_endpoint_prefixes.push("api/sin-barra".to_string());
        config.retries.retryable_statuses.push(200);
        config.upstream.base_url = "not a url".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "cache.max_entries" }));
        assert!(errors.contains(&ValidationError::BadStatus(200)));
    }

    #[test]
    fn test_backoff_range() {
        let mut config = PipelineConfig::default();
        config.retries.base_delay_ms = 20_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::BackoffRange { base: 20_000, max: 10_000 }]
        );
    }
}
