//! The set of consumers this replica currently owns.

use crate::types::ConsumerId;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Thread-safe set of the consumer ids assigned to this replica.
///
/// `contains` is the dispatch hot path; it is a single read-lock membership
/// check and is safe to call concurrently with reconciliation updates.
#[derive(Debug, Default)]
pub struct ConsumerSet {
    consumers: RwLock<HashSet<ConsumerId>>,
}

impl ConsumerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this replica owns the given consumer.
    pub fn contains(&self, consumer_id: &str) -> bool {
        self.consumers.read().contains(consumer_id)
    }

    /// Add a batch of consumers.
    pub fn extend(&self, consumer_ids: impl IntoIterator<Item = ConsumerId>) {
        self.consumers.write().extend(consumer_ids);
    }

    /// Remove a batch of consumers. Absent ids are ignored.
    pub fn remove_all(&self, consumer_ids: &[ConsumerId]) {
        let mut consumers = self.consumers.write();
        for id in consumer_ids {
            consumers.remove(id);
        }
    }

    /// Copy of the current membership.
    pub fn snapshot(&self) -> Vec<ConsumerId> {
        self.consumers.read().iter().cloned().collect()
    }

    /// Number of owned consumers.
    pub fn len(&self) -> usize {
        self.consumers.read().len()
    }

    /// Whether no consumers are owned.
    pub fn is_empty(&self) -> bool {
        self.consumers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_and_contains() {
        let set = ConsumerSet::new();
        assert!(!set.contains("consumer-1"));

        set.extend(vec!["consumer-1".to_string(), "consumer-2".to_string()]);
        assert!(set.contains("consumer-1"));
        assert!(set.contains("consumer-2"));
        assert!(!set.contains("consumer-3"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_all() {
        let set = ConsumerSet::new();
        set.extend(vec!["consumer-1".to_string(), "consumer-2".to_string()]);

        set.remove_all(&["consumer-1".to_string(), "consumer-9".to_string()]);
        assert!(!set.contains("consumer-1"));
        assert!(set.contains("consumer-2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_extend_deduplicates() {
        let set = ConsumerSet::new();
        set.extend(vec!["consumer-1".to_string()]);
        set.extend(vec!["consumer-1".to_string()]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_snapshot() {
        let set = ConsumerSet::new();
        set.extend(vec!["consumer-1".to_string(), "consumer-2".to_string()]);

        let mut snapshot = set.snapshot();
        snapshot.sort();
        assert_eq!(snapshot, vec!["consumer-1", "consumer-2"]);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        use std::sync::Arc;

        let set = Arc::new(ConsumerSet::new());
        let mut handles = Vec::new();

        for batch in 0..4 {
            let set = set.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    set.extend(vec![format!("consumer-{batch}-{i}")]);
                    set.contains("consumer-0-0");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(set.len(), 400);
    }
}
