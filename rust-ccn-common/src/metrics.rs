//! Metrics collection and reporting for the forwarder.
//!
//! All primitives are lock-free and updated with relaxed atomics; a
//! consistent view is only needed when a [`MetricsSnapshot`] is taken.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Simple Counter
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/* ---------------------------------------------------------------- *
 * Gauge
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/* ---------------------------------------------------------------- *
 * Histogram
 * ---------------------------------------------------------------- */

/// Bucketed distribution. A value lands in the first bucket whose upper
/// boundary is at least the value; larger values count as overflow.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    boundaries: Vec<u64>,
    overflow: AtomicU64,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(mut boundaries: Vec<u64>) -> Self {
        boundaries.sort_unstable();
        boundaries.dedup();
        let buckets = boundaries.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            buckets,
            boundaries,
            overflow: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Boundaries suited to latencies in milliseconds.
    pub fn latency_ms() -> Self {
        Self::new(vec![1, 5, 10, 50, 100, 500, 1_000, 5_000, 30_000])
    }

    pub fn observe(&self, value: u64) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = self.boundaries.partition_point(|&b| b < value);
        match self.buckets.get(idx) {
            Some(bucket) => bucket.fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn average(&self) -> f64 {
        let c = self.count.load(Ordering::Relaxed);
        if c == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / c as f64
        }
    }

    /// `(upper boundary, count)` per bucket.
    pub fn counts(&self) -> Vec<(u64, u64)> {
        self.boundaries
            .iter()
            .zip(self.buckets.iter())
            .map(|(&b, bucket)| (b, bucket.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn overflow(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::latency_ms()
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate metrics for the forwarder
 * ---------------------------------------------------------------- */

#[derive(Debug, Default)]
pub struct CcnMetrics {
    // Interest processing
    pub interests_received: Counter,
    pub interests_satisfied: Counter,
    pub interests_timed_out: Counter,
    /// Interests that joined an existing PIT entry
    pub interests_aggregated: Counter,
    /// Interests dropped because their nonce was already pending
    pub interests_duplicate: Counter,
    pub malformed_dropped: Counter,

    // Content processing
    pub content_received: Counter,
    pub content_unsolicited: Counter,

    // Cache metrics
    pub cs_hits: Counter,
    pub cs_misses: Counter,
    pub cs_inserts: Counter,
    pub cs_evictions: Counter,
    pub cs_stale_reclaimed: Counter,
    pub cs_size: Gauge,

    // PIT metrics
    pub pit_inserts: Counter,
    pub pit_size: Gauge,

    // Producers
    pub producer_dispatches: Counter,

    /// Time from Interest arrival to delivery, in milliseconds
    pub satisfaction_latency: Histogram,
}

impl CcnMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every metric into a serialisable value.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interests_received: self.interests_received.value(),
            interests_satisfied: self.interests_satisfied.value(),
            interests_timed_out: self.interests_timed_out.value(),
            interests_aggregated: self.interests_aggregated.value(),
            interests_duplicate: self.interests_duplicate.value(),
            malformed_dropped: self.malformed_dropped.value(),
            content_received: self.content_received.value(),
            content_unsolicited: self.content_unsolicited.value(),
            cs_hits: self.cs_hits.value(),
            cs_misses: self.cs_misses.value(),
            cs_inserts: self.cs_inserts.value(),
            cs_evictions: self.cs_evictions.value(),
            cs_stale_reclaimed: self.cs_stale_reclaimed.value(),
            cs_size: self.cs_size.value(),
            pit_inserts: self.pit_inserts.value(),
            pit_size: self.pit_size.value(),
            producer_dispatches: self.producer_dispatches.value(),
            satisfaction_latency_avg_ms: self.satisfaction_latency.average(),
        }
    }
}

/// Point-in-time copy of [`CcnMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub interests_received: u64,
    pub interests_satisfied: u64,
    pub interests_timed_out: u64,
    pub interests_aggregated: u64,
    pub interests_duplicate: u64,
    pub malformed_dropped: u64,
    pub content_received: u64,
    pub content_unsolicited: u64,
    pub cs_hits: u64,
    pub cs_misses: u64,
    pub cs_inserts: u64,
    pub cs_evictions: u64,
    pub cs_stale_reclaimed: u64,
    pub cs_size: u64,
    pub pit_inserts: u64,
    pub pit_size: u64,
    pub producer_dispatches: u64,
    pub satisfaction_latency_avg_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_gauge() {
        let c = Counter::new();
        c.increment();
        c.add(4);
        assert_eq!(c.value(), 5);

        let g = Gauge::new();
        g.set(12);
        assert_eq!(g.value(), 12);
    }

    #[test]
    fn test_histogram_buckets() {
        let h = Histogram::new(vec![10, 1, 100]);
        h.observe(0);
        h.observe(1);
        h.observe(50);
        h.observe(1000);
        assert_eq!(h.counts(), vec![(1, 2), (10, 0), (100, 1)]);
        assert_eq!(h.overflow(), 1);
        assert_eq!(h.count(), 4);
        assert!((h.average() - 262.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serialises() {
        let metrics = CcnMetrics::new();
        metrics.interests_received.add(3);
        metrics.cs_size.set(2);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.interests_received, 3);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cs_size"], 2);
    }
}
