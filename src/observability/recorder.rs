//! Rolling log of completed requests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::observability::metrics;
use crate::request::{Method, RequestDescriptor};

/// Timing, size and outcome of one settled dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetric {
    pub url: String,
    pub method: Method,
    /// Wall-clock start, milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_ms: u64,
    /// HTTP status, absent when none was received (network failure, timeout).
    pub status: Option<u16>,
    pub response_size: usize,
    pub slow: bool,
}

struct Inner {
    records: VecDeque<RequestMetric>,
    max_records: usize,
    slow_threshold: Duration,
}

/// Bounded FIFO of [`RequestMetric`]s. Oldest records are dropped first.
pub struct MetricsRecorder {
    inner: Mutex<Inner>,
}

impl MetricsRecorder {
    pub fn new(max_records: usize, slow_threshold: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(max_records),
                max_records: max_records.max(1),
                slow_threshold,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record. `started_at` is wall-clock; `duration` is measured on
    /// the monotonic clock by the caller.
    pub fn record(
        &self,
        request: &RequestDescriptor,
        started_at: SystemTime,
        duration: Duration,
        status: Option<u16>,
        response_size: usize,
    ) -> RequestMetric {
        let mut inner = self.lock();

        let started_at_ms = started_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let duration_ms = duration.as_millis() as u64;
        let slow = duration > inner.slow_threshold;

        let metric = RequestMetric {
            url: request.url().to_string(),
            method: request.method(),
            started_at_ms,
            ended_at_ms: started_at_ms + duration_ms,
            duration_ms,
            status,
            response_size,
            slow,
        };

        if slow {
            tracing::warn!(
                method = %metric.method,
                url = %metric.url,
                duration_ms,
                threshold_ms = inner.slow_threshold.as_millis() as u64,
                "Slow request"
            );
            metrics::record_slow_request(metric.method.as_str());
        }

        inner.records.push_back(metric.clone());
        while inner.records.len() > inner.max_records {
            inner.records.pop_front();
        }
        metric
    }

    /// Records oldest first.
    pub fn all(&self) -> Vec<RequestMetric> {
        self.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().records.clear();
    }

    /// Apply new bounds; shrinking drops the oldest records immediately.
    pub fn reconfigure(&self, max_records: usize, slow_threshold: Duration) {
        let mut inner = self.lock();
        inner.max_records = max_records.max(1);
        inner.slow_threshold = slow_threshold;
        while inner.records.len() > inner.max_records {
            inner.records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(max: usize) -> MetricsRecorder {
        MetricsRecorder::new(max, Duration::from_millis(5_000))
    }

    #[test]
    fn test_fifo_bound() {
        let recorder = recorder(100);
        for i in 0..105 {
            let req = RequestDescriptor::get(format!("/api/hoteles/{i}"));
            recorder.record(&req, SystemTime::now(), Duration::from_millis(10), Some(200), 10);
        }

        let all = recorder.all();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].url, "/api/hoteles/5");
        assert_eq!(all[99].url, "/api/hoteles/104");
    }

    #[test]
    fn test_slow_flag_and_times() {
        let recorder = recorder(10);
        let start = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let req = RequestDescriptor::get("/api/reportes");

        let fast = recorder.record(&req, start, Duration::from_millis(5_000), Some(200), 1);
        let slow = recorder.record(&req, start, Duration::from_millis(5_001), None, 0);

        assert!(!fast.slow);
        assert!(slow.slow);
        assert_eq!(slow.started_at_ms, 1_700_000_000_000);
        assert_eq!(slow.ended_at_ms, 1_700_000_005_001);
        assert_eq!(slow.status, None);
    }

    #[test]
    fn test_reconfigure_shrinks() {
        let recorder = recorder(10);
        let req = RequestDescriptor::get("/api/hoteles");
        for _ in 0..10 {
            recorder.record(&req, SystemTime::now(), Duration::ZERO, Some(200), 0);
        }
        recorder.reconfigure(3, Duration::from_secs(1));
        assert_eq!(recorder.len(), 3);
    }
}
