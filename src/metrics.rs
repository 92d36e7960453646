//! Metrics for monitoring the dispatcher.
//!
//! Counters track reconcile and resync outcomes; gauges mirror the current
//! size of the ring, the owned set, and the resync queue. Persistent resync
//! failures surface here and in the warn-level logs.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicU64::new(0),
        }
    }

    /// Get the counter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge that can increase or decrease.
#[derive(Debug)]
pub struct Gauge {
    name: &'static str,
    value: AtomicI64,
}

impl Gauge {
    /// Create a new gauge.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicI64::new(0),
        }
    }

    /// Get the gauge name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Set the gauge to a specific value.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Get the current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Metrics exposed by the dispatcher.
#[derive(Debug)]
pub struct DispatcherMetrics {
    /// Reconcile passes started.
    pub reconcile_total: Counter,
    /// Reconcile passes that failed on a listing.
    pub reconcile_failures: Counter,
    /// Successful resync requests.
    pub resync_success: Counter,
    /// Failed resync requests (each is requeued with back-off).
    pub resync_failures: Counter,
    /// Consumers currently owned by this replica.
    pub owned_consumers: Gauge,
    /// Replicas currently on the hash ring.
    pub ring_members: Gauge,
    /// Resync requests ready in the queue.
    pub queue_depth: Gauge,
}

impl DispatcherMetrics {
    /// Create a fresh metrics set.
    pub const fn new() -> Self {
        Self {
            reconcile_total: Counter::new("dispatcher_reconcile_total"),
            reconcile_failures: Counter::new("dispatcher_reconcile_failures_total"),
            resync_success: Counter::new("dispatcher_resync_success_total"),
            resync_failures: Counter::new("dispatcher_resync_failures_total"),
            owned_consumers: Gauge::new("dispatcher_owned_consumers"),
            ring_members: Gauge::new("dispatcher_ring_members"),
            queue_depth: Gauge::new("dispatcher_resync_queue_depth"),
        }
    }

    /// Capture a point-in-time view of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reconcile_total: self.reconcile_total.get(),
            reconcile_failures: self.reconcile_failures.get(),
            resync_success: self.resync_success.get(),
            resync_failures: self.resync_failures.get(),
            owned_consumers: self.owned_consumers.get(),
            ring_members: self.ring_members.get(),
            queue_depth: self.queue_depth.get(),
        }
    }
}

impl Default for DispatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the dispatcher metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reconcile_total: u64,
    pub reconcile_failures: u64,
    pub resync_success: u64,
    pub resync_failures: u64,
    pub owned_consumers: i64,
    pub ring_members: i64,
    pub queue_depth: i64,
}
