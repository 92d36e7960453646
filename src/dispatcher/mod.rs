//! Consumer-to-replica assignment.
//!
//! Every replica runs one [`HashDispatcher`]. All replicas evaluate the
//! same consistent-hash ring over the same membership, so they agree on
//! which replica owns which consumer without coordinating. The event
//! transport asks [`Dispatcher::dispatch`] whether this replica should
//! process an incoming event; membership changes arrive as
//! [`Dispatcher::on_instance_up`] / [`Dispatcher::on_instance_down`]
//! signals, and a periodic reconcile pass self-heals against signals that
//! were missed.
//!
//! ```text
//!  liveness signals ──▶ on_instance_up/down ─┐
//!                                            ▼
//!  5 s tick ─────────────────────────▶ Reconciler ──▶ ConsumerSet ◀── dispatch()
//!                                            │
//!                                            ▼
//!                                       ResyncQueue ──▶ workers ──▶ resync()
//! ```

mod reconciler;
mod worker;

use crate::catalog::{ConsumerCatalog, InstanceCatalog, ResyncTransport};
use crate::config::DispatcherConfig;
use crate::error::Result;
use crate::metrics::DispatcherMetrics;
use crate::partitioning::{ConsumerSet, HashRing};
use crate::queue::ResyncQueue;
use crate::types::{DispatcherStats, ReplicaId};
use async_trait::async_trait;
use parking_lot::RwLock;
use self::reconciler::Reconciler;
use self::worker::run_resync_worker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Decides whether this replica processes events for a given consumer.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Whether this replica currently owns the consumer.
    ///
    /// Non-blocking; safe to call concurrently with reconciliation. The
    /// event transport drops the event on this replica when this returns
    /// false.
    fn dispatch(&self, consumer_id: &str) -> bool;

    /// Signal that a replica came up. Idempotent.
    async fn on_instance_up(&self, instance_id: ReplicaId) -> Result<()>;

    /// Signal that a replica went down. Idempotent.
    async fn on_instance_down(&self, instance_id: ReplicaId) -> Result<()>;

    /// Run the dispatcher until `shutdown` is cancelled.
    ///
    /// Spawns the resync workers and the periodic reconcile tick, then
    /// blocks. On cancellation the queue is shut down and the call returns
    /// once every worker has exited.
    async fn start(&self, shutdown: CancellationToken);
}

/// [`Dispatcher`] backed by a bounded-load consistent-hash ring.
pub struct HashDispatcher {
    config: DispatcherConfig,
    ring: Arc<RwLock<HashRing>>,
    consumer_set: Arc<ConsumerSet>,
    queue: Arc<ResyncQueue>,
    transport: Arc<dyn ResyncTransport>,
    metrics: Arc<DispatcherMetrics>,
    reconciler: Reconciler,
}

impl HashDispatcher {
    /// Create a dispatcher for this replica.
    ///
    /// Fails only on invalid configuration; no I/O happens until
    /// [`start`](Dispatcher::start) or a membership signal.
    pub fn new(
        config: DispatcherConfig,
        instances: Arc<dyn InstanceCatalog>,
        consumers: Arc<dyn ConsumerCatalog>,
        transport: Arc<dyn ResyncTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let ring = Arc::new(RwLock::new(HashRing::new(&config.ring)));
        let consumer_set = Arc::new(ConsumerSet::new());
        let queue = Arc::new(ResyncQueue::with_backoff(
            config.resync_base_delay,
            config.resync_max_delay,
        ));
        let metrics = Arc::new(DispatcherMetrics::new());

        let reconciler = Reconciler::new(
            config.instance_id.clone(),
            ring.clone(),
            consumer_set.clone(),
            queue.clone(),
            instances,
            consumers,
            metrics.clone(),
        );

        Ok(Self {
            config,
            ring,
            consumer_set,
            queue,
            transport,
            metrics,
            reconciler,
        })
    }

    /// This replica's id.
    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    /// Current counters for the ring, the owned set, and the queue.
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            owned_consumers: self.consumer_set.len(),
            ring_members: self.ring.read().len(),
            queue_depth: self.queue.len(),
        }
    }

    /// Metrics handle, shared with the workers and the reconciler.
    pub fn metrics(&self) -> Arc<DispatcherMetrics> {
        self.metrics.clone()
    }

    #[cfg(test)]
    pub(crate) fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

#[async_trait]
impl Dispatcher for HashDispatcher {
    fn dispatch(&self, consumer_id: &str) -> bool {
        self.consumer_set.contains(consumer_id)
    }

    async fn on_instance_up(&self, instance_id: ReplicaId) -> Result<()> {
        {
            let mut ring = self.ring.write();
            if ring.contains(&instance_id) {
                return Ok(());
            }
            info!(instance = %instance_id, "instance up, adding to hash ring");
            ring.add(instance_id);
        }
        self.reconciler.reconcile().await
    }

    async fn on_instance_down(&self, instance_id: ReplicaId) -> Result<()> {
        {
            let mut ring = self.ring.write();
            if !ring.contains(&instance_id) {
                return Ok(());
            }
            info!(instance = %instance_id, "instance down, removing from hash ring");
            ring.remove(&instance_id);
        }
        self.reconciler.reconcile().await
    }

    async fn start(&self, shutdown: CancellationToken) {
        info!(
            instance = %self.config.instance_id,
            workers = self.config.resync_workers,
            interval = ?self.config.reconcile_interval,
            "starting dispatcher"
        );

        let mut workers = Vec::with_capacity(self.config.resync_workers);
        for worker_id in 0..self.config.resync_workers {
            workers.push(tokio::spawn(run_resync_worker(
                worker_id,
                self.queue.clone(),
                self.transport.clone(),
                self.metrics.clone(),
                shutdown.clone(),
            )));
        }

        let mut ticker = tokio::time::interval(self.config.reconcile_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(error) = self.reconciler.reconcile().await {
                        warn!(error = %error, "reconcile failed, retrying on next tick");
                    }
                }
            }
        }

        self.queue.shut_down();
        for worker in workers {
            let _ = worker.await;
        }
        info!(instance = %self.config.instance_id, "dispatcher stopped");
    }
}

impl std::fmt::Debug for HashDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashDispatcher")
            .field("instance_id", &self.config.instance_id)
            .field("ring_members", &self.ring.read().len())
            .field("owned_consumers", &self.consumer_set.len())
            .finish()
    }
}
