//! Reconciliation of the ring and the owned set against the catalogs.

use crate::catalog::{ConsumerCatalog, InstanceCatalog};
use crate::error::Result;
use crate::metrics::DispatcherMetrics;
use crate::partitioning::{ConsumerSet, HashRing};
use crate::queue::ResyncQueue;
use crate::types::ReplicaId;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Drives one reconciliation pass: prune dead ring members, then diff the
/// consumer catalog against the local owned set.
///
/// Passes are serialised; the periodic tick and the membership signals
/// share one lock around the body. External listings are snapshotted
/// before any internal lock is taken, and a resync is enqueued only when a
/// consumer is acquired, never when one is released.
pub(crate) struct Reconciler {
    instance_id: ReplicaId,
    ring: Arc<RwLock<HashRing>>,
    consumer_set: Arc<ConsumerSet>,
    queue: Arc<ResyncQueue>,
    instances: Arc<dyn InstanceCatalog>,
    consumers: Arc<dyn ConsumerCatalog>,
    metrics: Arc<DispatcherMetrics>,
    serialize: tokio::sync::Mutex<()>,
}

impl Reconciler {
    pub(crate) fn new(
        instance_id: ReplicaId,
        ring: Arc<RwLock<HashRing>>,
        consumer_set: Arc<ConsumerSet>,
        queue: Arc<ResyncQueue>,
        instances: Arc<dyn InstanceCatalog>,
        consumers: Arc<dyn ConsumerCatalog>,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        Self {
            instance_id,
            ring,
            consumer_set,
            queue,
            instances,
            consumers,
            metrics,
            serialize: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// On a listing error nothing is mutated; the caller retries on the
    /// next tick. A ring member that the live listing no longer contains
    /// may still win a `locate` during the same pass; the following pass
    /// removes it, so ownership converges within one tick.
    pub(crate) async fn reconcile(&self) -> Result<()> {
        let _serial = self.serialize.lock().await;
        self.metrics.reconcile_total.inc();

        let result = self.run().await;
        if result.is_err() {
            self.metrics.reconcile_failures.inc();
        }
        result
    }

    async fn run(&self) -> Result<()> {
        let instances = self.instances.list_instances().await?;
        let alive: HashSet<&str> = instances.iter().map(|record| record.id.as_str()).collect();

        {
            let mut ring = self.ring.write();
            let stale: Vec<ReplicaId> = ring
                .members()
                .iter()
                .filter(|member| !alive.contains(member.as_str()))
                .cloned()
                .collect();
            for member in &stale {
                debug!(instance = %member, "removing ring member absent from live listing");
                ring.remove(member);
            }
            self.metrics.ring_members.set(ring.len() as i64);

            // An empty ring means no replica is assignable; leaving the
            // owned set untouched keeps a transient flap from evicting
            // every consumer.
            if ring.is_empty() {
                return Ok(());
            }
        }

        let consumers = self.consumers.list_consumers().await?;

        let (to_add, to_remove) = {
            let ring = self.ring.read();
            if ring.is_empty() {
                return Ok(());
            }

            let mut to_add = Vec::new();
            let mut to_remove = Vec::new();
            for consumer in &consumers {
                let owner = ring.locate(consumer.id.as_bytes())?;
                if *owner == self.instance_id {
                    if !self.consumer_set.contains(&consumer.id) {
                        to_add.push(consumer.id.clone());
                    }
                } else if self.consumer_set.contains(&consumer.id) {
                    to_remove.push(consumer.id.clone());
                }
            }
            (to_add, to_remove)
        };

        for consumer_id in &to_add {
            debug!(consumer = %consumer_id, "acquired consumer, scheduling status resync");
            self.queue.add(consumer_id.clone());
        }
        if !to_remove.is_empty() {
            debug!(count = to_remove.len(), "releasing consumers owned elsewhere");
        }

        self.consumer_set.extend(to_add);
        self.consumer_set.remove_all(&to_remove);

        self.metrics.owned_consumers.set(self.consumer_set.len() as i64);
        self.metrics.queue_depth.set(self.queue.len() as i64);

        Ok(())
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("instance_id", &self.instance_id)
            .field("ring_members", &self.ring.read().len())
            .field("owned_consumers", &self.consumer_set.len())
            .finish()
    }
}
