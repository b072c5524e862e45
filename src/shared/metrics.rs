//! Process-wide request metrics. One registry is created in `main` and
//! injected into the services that record into it.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters for facade requests.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    request_count: AtomicU64,
    cumulative_latency_us: AtomicU64,
    degraded_count: AtomicU64,
    remote_calls: AtomicU64,
    cache_hits: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    /// Mean facade latency in seconds (0.0 before the first request).
    pub average_latency: f64,
    pub degraded_count: u64,
    pub remote_calls: u64,
    pub cache_hits: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished facade call.
    pub fn record_request(&self, latency: Duration, degraded: bool) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.cumulative_latency_us
            .fetch_add(micros, Ordering::Relaxed);
        if degraded {
            self.degraded_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_remote_calls(&self, count: u64) {
        self.remote_calls.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let request_count = self.request_count.load(Ordering::Relaxed);
        let total_us = self.cumulative_latency_us.load(Ordering::Relaxed);
        let average_latency = if request_count == 0 {
            0.0
        } else {
            total_us as f64 / request_count as f64 / 1_000_000.0
        };

        MetricsSnapshot {
            request_count,
            average_latency,
            degraded_count: self.degraded_count.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.average_latency, 0.0);
    }

    #[test]
    fn test_average_latency() {
        let metrics = MetricsRegistry::new();
        metrics.record_request(Duration::from_millis(100), false);
        metrics.record_request(Duration::from_millis(300), true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.degraded_count, 1);
        assert!((snapshot.average_latency - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&metrics);
                tokio::spawn(async move {
                    for _ in 0..100 {
                        m.record_remote_calls(1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(metrics.snapshot().remote_calls, 800);
    }
}
