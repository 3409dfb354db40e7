//! Exponential backoff with optional jitter.

use std::time::Duration;

/// Delay before the retry that follows attempt `attempt` (0-based):
/// `min(base * 2^attempt, max)`, plus up to 10% jitter when enabled.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter: bool) -> Duration {
    let exponential = 2u64.saturating_pow(attempt);
    let capped_delay = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_ms = if jitter && capped_delay >= 10 {
        fastrand::u64(0..capped_delay / 10)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter_ms)
}
