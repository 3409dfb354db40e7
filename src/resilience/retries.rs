//! Retry policy.
//!
//! # Design Decisions
//! - Never retry POST/PUT/PATCH/DELETE (duplicate side effects)
//! - Endpoint overrides apply to idempotent methods only
//! - Only the configured transient statuses are retryable; connection
//!   errors are retryable when `retry_network_errors` is set

use std::time::Duration;

use crate::config::RetryConfig;
use crate::request::RequestDescriptor;
use crate::resilience::backoff::calculate_backoff;
use crate::routing::longest_prefix;
use crate::transport::TransportError;

/// Retry parameters resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    pub max_retries: u32,
    pub retryable_statuses: Vec<u16>,
    pub retry_network_errors: bool,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl RetryPlan {
    /// Whether another attempt may follow attempt `attempt` (0-based) that
    /// failed with `failure`.
    pub fn should_retry(&self, attempt: u32, failure: &TransportError) -> bool {
        attempt < self.max_retries && self.is_retryable(failure)
    }

    pub fn is_retryable(&self, failure: &TransportError) -> bool {
        match failure {
            TransportError::Status { status, .. } => self.retryable_statuses.contains(status),
            TransportError::Connect(_) | TransportError::Io(_) => self.retry_network_errors,
            TransportError::InvalidUrl(_) => false,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms, self.jitter)
    }
}

/// Resolve the retry plan for a request.
pub fn retry_plan_for(request: &RequestDescriptor, config: &RetryConfig) -> RetryPlan {
    let max_retries = if request.method().is_mutation() {
        0
    } else {
        longest_prefix(&config.overrides_by_endpoint, &request.path())
            .map(|o| o.max_retries)
            .unwrap_or(config.default_max_retries)
    };

    RetryPlan {
        max_retries,
        retryable_statuses: config.retryable_statuses.clone(),
        retry_network_errors: config.retry_network_errors,
        base_delay_ms: config.base_delay_ms,
        max_delay_ms: config.max_delay_ms,
        jitter: config.jitter,
    }
}
