//! Core types used throughout the dispatcher.

use serde::{Deserialize, Serialize};

/// Identifier of one server replica in the fleet. Stable for the lifetime
/// of the process it names.
pub type ReplicaId = String;

/// Identifier of an external consumer whose status events must be processed
/// by exactly one replica.
pub type ConsumerId = String;

/// A replica as reported by the fleet's liveness system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Unique replica identifier.
    pub id: ReplicaId,
}

impl InstanceRecord {
    /// Create a new instance record.
    pub fn new(id: impl Into<ReplicaId>) -> Self {
        Self { id: id.into() }
    }
}

/// A consumer as reported by the consumer catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsumerRecord {
    /// Unique consumer identifier.
    pub id: ConsumerId,
}

impl ConsumerRecord {
    /// Create a new consumer record.
    pub fn new(id: impl Into<ConsumerId>) -> Self {
        Self { id: id.into() }
    }
}

/// Point-in-time counters describing a dispatcher's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Consumers currently owned by this replica.
    pub owned_consumers: usize,
    /// Replicas currently on the hash ring.
    pub ring_members: usize,
    /// Resync requests waiting in the queue.
    pub queue_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_constructors() {
        let instance = InstanceRecord::new("replica-a");
        assert_eq!(instance.id, "replica-a");

        let consumer = ConsumerRecord::new(String::from("consumer-1"));
        assert_eq!(consumer.id, "consumer-1");
    }

    #[test]
    fn test_record_serialization() {
        let record = ConsumerRecord::new("consumer-1");
        let json = serde_json::to_string(&record).unwrap();
        let decoded: ConsumerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, decoded);
    }
}
