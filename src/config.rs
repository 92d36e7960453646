//! Configuration types for the dispatcher.

use crate::error::{Error, Result};
use crate::types::ReplicaId;
use std::time::Duration;

/// Default number of partitions consumer keys are bucketed into.
pub const DEFAULT_PARTITION_COUNT: u64 = 7;

/// Default number of ring positions per replica.
pub const DEFAULT_REPLICATION_FACTOR: usize = 20;

/// Default bounded-load factor.
pub const DEFAULT_LOAD_FACTOR: f64 = 1.25;

/// Default period of the reconcile tick.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Default size of the resync worker pool.
pub const DEFAULT_RESYNC_WORKERS: usize = 10;

/// Consistent-hash ring parameters.
///
/// The same values must be configured on every replica in the fleet; they
/// feed the deterministic partition placement that replicas agree on
/// without coordinating.
#[derive(Debug, Clone, PartialEq)]
pub struct RingConfig {
    /// Number of partitions keys are bucketed into. Partitions are the
    /// granularity of rebalance, so a small count suits small fleets.
    pub partition_count: u64,

    /// Number of ring positions assigned to each replica.
    pub replication_factor: usize,

    /// Maximum allowed imbalance: no replica is assigned more than
    /// `load_factor × (partition_count / members)` partitions.
    pub load_factor: f64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl RingConfig {
    /// Set the partition count.
    pub fn with_partition_count(mut self, partition_count: u64) -> Self {
        self.partition_count = partition_count;
        self
    }

    /// Set the replication factor.
    pub fn with_replication_factor(mut self, replication_factor: usize) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    /// Set the bounded-load factor.
    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Check the parameters for values the ring cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(Error::Config("partition_count must be at least 1".into()));
        }
        if self.replication_factor == 0 {
            return Err(Error::Config("replication_factor must be at least 1".into()));
        }
        if !(self.load_factor >= 1.0) {
            return Err(Error::Config(format!(
                "load_factor must be at least 1.0, got {}",
                self.load_factor
            )));
        }
        Ok(())
    }
}

/// Main configuration for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// This replica's identifier. Required; must match the id the liveness
    /// system reports for this process.
    pub instance_id: ReplicaId,

    /// Hash ring parameters.
    pub ring: RingConfig,

    /// Period of the self-healing reconcile tick.
    pub reconcile_interval: Duration,

    /// Number of resync workers draining the queue.
    pub resync_workers: usize,

    /// Initial back-off after a failed resync.
    pub resync_base_delay: Duration,

    /// Upper bound on the resync back-off.
    pub resync_max_delay: Duration,
}

impl DispatcherConfig {
    /// Create a configuration for the given replica with default tuning.
    pub fn new(instance_id: impl Into<ReplicaId>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ring: RingConfig::default(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            resync_workers: DEFAULT_RESYNC_WORKERS,
            resync_base_delay: crate::queue::DEFAULT_BASE_DELAY,
            resync_max_delay: crate::queue::DEFAULT_MAX_DELAY,
        }
    }

    /// Set the ring parameters.
    pub fn with_ring(mut self, ring: RingConfig) -> Self {
        self.ring = ring;
        self
    }

    /// Set the reconcile tick period.
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Set the resync worker pool size.
    pub fn with_resync_workers(mut self, workers: usize) -> Self {
        self.resync_workers = workers;
        self
    }

    /// Set the resync back-off bounds.
    pub fn with_resync_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.resync_base_delay = base;
        self.resync_max_delay = max;
        self
    }

    /// Check the configuration for values the dispatcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.is_empty() {
            return Err(Error::Config("instance_id must not be empty".into()));
        }
        if self.reconcile_interval.is_zero() {
            return Err(Error::Config("reconcile_interval must be non-zero".into()));
        }
        if self.resync_workers == 0 {
            return Err(Error::Config("resync_workers must be at least 1".into()));
        }
        self.ring.validate()
    }
}
