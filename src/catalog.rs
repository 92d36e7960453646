//! External collaborators consumed by the dispatcher.
//!
//! The dispatcher never talks to storage, membership, or the event
//! transport directly; it sees three read-side seams:
//!
//! - [`InstanceCatalog`]: which replicas the fleet's liveness system
//!   currently considers alive.
//! - [`ConsumerCatalog`]: all consumers known to the system.
//! - [`ResyncTransport`]: asks the event transport to re-emit the latest
//!   status for a set of consumers after an ownership change.
//!
//! Static in-memory implementations are provided for tests and
//! single-process setups.

use crate::error::Result;
use crate::types::{ConsumerId, ConsumerRecord, InstanceRecord};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Read-only listing of replicas the fleet considers alive.
#[async_trait]
pub trait InstanceCatalog: Send + Sync {
    /// Point-in-time snapshot of the live replicas.
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>>;
}

/// Read-only listing of all known consumers.
#[async_trait]
pub trait ConsumerCatalog: Send + Sync {
    /// Point-in-time snapshot of the consumer population.
    async fn list_consumers(&self) -> Result<Vec<ConsumerRecord>>;
}

/// Channel to the event transport for status resync requests.
#[async_trait]
pub trait ResyncTransport: Send + Sync {
    /// Request that the latest status be re-emitted for each consumer.
    ///
    /// Must be idempotent: the dispatcher retries failed requests and may
    /// issue duplicates around ownership changes.
    async fn resync(&self, consumer_ids: &[ConsumerId]) -> Result<()>;
}

/// Instance catalog backed by an in-memory list.
#[derive(Debug, Default)]
pub struct StaticInstanceCatalog {
    instances: RwLock<Vec<InstanceRecord>>,
}

impl StaticInstanceCatalog {
    /// Create a catalog listing the given replica ids.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: RwLock::new(ids.into_iter().map(InstanceRecord::new).collect()),
        }
    }

    /// Replace the listing.
    pub fn set<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.instances.write() = ids.into_iter().map(InstanceRecord::new).collect();
    }
}

#[async_trait]
impl InstanceCatalog for StaticInstanceCatalog {
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        Ok(self.instances.read().clone())
    }
}

/// Consumer catalog backed by an in-memory list.
#[derive(Debug, Default)]
pub struct StaticConsumerCatalog {
    consumers: RwLock<Vec<ConsumerRecord>>,
}

impl StaticConsumerCatalog {
    /// Create a catalog listing the given consumer ids.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            consumers: RwLock::new(ids.into_iter().map(ConsumerRecord::new).collect()),
        }
    }

    /// Replace the listing.
    pub fn set<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.consumers.write() = ids.into_iter().map(ConsumerRecord::new).collect();
    }
}

#[async_trait]
impl ConsumerCatalog for StaticConsumerCatalog {
    async fn list_consumers(&self) -> Result<Vec<ConsumerRecord>> {
        Ok(self.consumers.read().clone())
    }
}

/// Transport that accepts and discards every resync request.
#[derive(Debug, Default)]
pub struct NoopResyncTransport;

#[async_trait]
impl ResyncTransport for NoopResyncTransport {
    async fn resync(&self, _consumer_ids: &[ConsumerId]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_instance_catalog() {
        let catalog = StaticInstanceCatalog::new(["replica-a", "replica-b"]);
        let instances = catalog.list_instances().await.unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].id, "replica-a");

        catalog.set(["replica-c"]);
        let instances = catalog.list_instances().await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id, "replica-c");
    }

    #[tokio::test]
    async fn test_static_consumer_catalog() {
        let catalog = StaticConsumerCatalog::new(["consumer-1"]);
        let consumers = catalog.list_consumers().await.unwrap();
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].id, "consumer-1");
    }

    #[tokio::test]
    async fn test_noop_transport() {
        let transport = NoopResyncTransport;
        assert!(transport.resync(&["consumer-1".to_string()]).await.is_ok());
    }
}
