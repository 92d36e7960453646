//! Consistent hashing with bounded load.
//!
//! Replicas are mapped onto a ring of hash positions via virtual nodes, and
//! a fixed number of partitions is distributed clockwise over those
//! positions. A replica already carrying its fair share of partitions
//! (`load_factor × partition_count / members`) is skipped, which bounds the
//! imbalance any single replica can accumulate.
//!
//! The ring is rebuilt from the sorted member list on every membership
//! change, so two replicas holding the same member set always agree on
//! `locate` for every key.

use crate::config::RingConfig;
use crate::error::{Result, RingError};
use crate::partitioning::hasher::sum64;
use crate::types::ReplicaId;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// A consistent-hash ring assigning partitions to replicas with bounded load.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Number of partitions keys are bucketed into.
    partition_count: u64,

    /// Ring positions per member.
    replication_factor: usize,

    /// Bounded-load factor; at least 1.0.
    load_factor: f64,

    /// Current members, sorted by id.
    members: Vec<ReplicaId>,

    /// Ring positions of every member's virtual nodes.
    positions: BTreeMap<u64, ReplicaId>,

    /// Owner of each partition; empty while the ring has no members.
    partitions: Vec<ReplicaId>,
}

impl HashRing {
    /// Create an empty ring with the given parameters.
    pub fn new(config: &RingConfig) -> Self {
        Self {
            partition_count: config.partition_count.max(1),
            replication_factor: config.replication_factor.max(1),
            load_factor: config.load_factor.max(1.0),
            members: Vec::new(),
            positions: BTreeMap::new(),
            partitions: Vec::new(),
        }
    }

    /// Number of members on the ring.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current membership, sorted by id.
    pub fn members(&self) -> &[ReplicaId] {
        &self.members
    }

    /// Whether a replica is on the ring.
    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    /// Add a member. Adding an existing member is a no-op.
    pub fn add(&mut self, member: ReplicaId) {
        match self.members.binary_search(&member) {
            Ok(_) => return,
            Err(idx) => self.members.insert(idx, member),
        }
        self.rebuild();
    }

    /// Remove a member. Removing an absent member is a no-op.
    pub fn remove(&mut self, member: &str) {
        let Some(idx) = self.members.iter().position(|m| m == member) else {
            return;
        };
        self.members.remove(idx);
        self.rebuild();
    }

    /// Maximum number of partitions any single member may be assigned.
    ///
    /// Returns zero while the ring is empty.
    pub fn average_load(&self) -> u64 {
        if self.members.is_empty() {
            return 0;
        }
        let average = self.partition_count as f64 / self.members.len() as f64;
        (average * self.load_factor).ceil() as u64
    }

    /// Locate the replica responsible for `key`.
    ///
    /// Deterministic for a fixed member set: every replica holding the same
    /// membership resolves the same owner. Fails with [`RingError::Empty`]
    /// while the ring has no members.
    pub fn locate(&self, key: &[u8]) -> Result<&ReplicaId> {
        if self.partitions.is_empty() {
            return Err(RingError::Empty.into());
        }
        let partition = (sum64(key) % self.partition_count) as usize;
        Ok(&self.partitions[partition])
    }

    /// Owners of all partitions, indexed by partition id.
    ///
    /// Empty while the ring has no members.
    pub fn partition_owners(&self) -> &[ReplicaId] {
        &self.partitions
    }

    /// Number of partitions assigned to each member.
    pub fn load_distribution(&self) -> HashMap<ReplicaId, u64> {
        let mut distribution = HashMap::new();
        for owner in &self.partitions {
            *distribution.entry(owner.clone()).or_insert(0) += 1;
        }
        distribution
    }

    /// Recompute ring positions and the partition table from the member list.
    fn rebuild(&mut self) {
        self.positions.clear();
        self.partitions.clear();
        if self.members.is_empty() {
            return;
        }

        for member in &self.members {
            for vnode in 0..self.replication_factor {
                let position = sum64(format!("{member}{vnode}").as_bytes());
                match self.positions.entry(position) {
                    Entry::Vacant(slot) => {
                        slot.insert(member.clone());
                    }
                    // Position collision: the lexicographically smaller id
                    // wins on every replica.
                    Entry::Occupied(mut slot) => {
                        if member < slot.get() {
                            slot.insert(member.clone());
                        }
                    }
                }
            }
        }

        let quota = self.average_load();
        self.partitions = self.spread_partitions(quota);
    }

    /// Walk each partition's anchor clockwise and assign the first member
    /// still below `quota`.
    fn spread_partitions(&self, quota: u64) -> Vec<ReplicaId> {
        let mut loads: HashMap<&ReplicaId, u64> = HashMap::with_capacity(self.members.len());
        let mut owners = Vec::with_capacity(self.partition_count as usize);

        for partition in 0..self.partition_count {
            let anchor = sum64(partition.to_string().as_bytes());
            let clockwise = self
                .positions
                .range(anchor..)
                .chain(self.positions.range(..anchor));

            for (_, member) in clockwise {
                let load = loads.get(member).copied().unwrap_or(0);
                if load < quota {
                    loads.insert(member, load + 1);
                    owners.push(member.clone());
                    break;
                }
            }
        }

        // With load_factor >= 1.0, members × quota >= partition_count, so
        // every partition finds an owner within one full cycle.
        debug_assert_eq!(owners.len(), self.partition_count as usize);
        owners
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(&RingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(members: &[&str]) -> HashRing {
        let mut ring = HashRing::default();
        for member in members {
            ring.add(member.to_string());
        }
        ring
    }

    fn sample_keys(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("consumer-{i}")).collect()
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::default();
        assert!(ring.is_empty());
        assert!(ring.locate(b"consumer-1").is_err());
        assert!(ring.partition_owners().is_empty());
        assert_eq!(ring.average_load(), 0);
    }

    #[test]
    fn test_single_member_owns_everything() {
        let ring = ring_with(&["replica-a"]);
        assert_eq!(ring.len(), 1);
        for key in sample_keys(50) {
            assert_eq!(ring.locate(key.as_bytes()).unwrap(), "replica-a");
        }
    }

    #[test]
    fn test_every_partition_has_an_owner() {
        let ring = ring_with(&["replica-a", "replica-b", "replica-c"]);
        assert_eq!(ring.partition_owners().len(), 7);
        for owner in ring.partition_owners() {
            assert!(ring.contains(owner));
        }
    }

    #[test]
    fn test_load_is_bounded() {
        let config = RingConfig::default().with_partition_count(271);
        let mut ring = HashRing::new(&config);
        for member in ["replica-a", "replica-b", "replica-c", "replica-d"] {
            ring.add(member.to_string());
        }

        let quota = ring.average_load();
        let distribution = ring.load_distribution();
        let total: u64 = distribution.values().sum();
        assert_eq!(total, 271);
        for (member, load) in distribution {
            assert!(load <= quota, "{member} carries {load} > quota {quota}");
        }
    }

    #[test]
    fn test_locate_agrees_across_replicas() {
        // Same membership added in different orders must resolve the same
        // owner on every replica.
        let ring_a = ring_with(&["replica-a", "replica-b", "replica-c"]);
        let ring_b = ring_with(&["replica-c", "replica-a", "replica-b"]);

        for key in sample_keys(100) {
            assert_eq!(
                ring_a.locate(key.as_bytes()).unwrap(),
                ring_b.locate(key.as_bytes()).unwrap()
            );
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut ring = ring_with(&["replica-a", "replica-b"]);
        let owners_before = ring.partition_owners().to_vec();

        ring.add("replica-a".to_string());

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.partition_owners(), owners_before.as_slice());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut ring = ring_with(&["replica-a"]);
        ring.remove("replica-z");
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.locate(b"consumer-1").unwrap(), "replica-a");
    }

    #[test]
    fn test_remove_last_member_empties_ring() {
        let mut ring = ring_with(&["replica-a"]);
        ring.remove("replica-a");
        assert!(ring.is_empty());
        assert!(ring.locate(b"consumer-1").is_err());
    }

    #[test]
    fn test_remove_reassigns_to_survivors() {
        let mut ring = ring_with(&["replica-a", "replica-b"]);
        ring.remove("replica-b");
        for key in sample_keys(50) {
            assert_eq!(ring.locate(key.as_bytes()).unwrap(), "replica-a");
        }
    }

    #[test]
    fn test_adding_a_member_moves_a_bounded_share() {
        let config = RingConfig::default().with_partition_count(271);
        let mut ring = HashRing::new(&config);
        for member in ["replica-a", "replica-b", "replica-c"] {
            ring.add(member.to_string());
        }
        let before = ring.partition_owners().to_vec();

        ring.add("replica-d".to_string());
        let after = ring.partition_owners();

        let moved = before
            .iter()
            .zip(after.iter())
            .filter(|(old, new)| old != new)
            .count();
        assert!(moved > 0, "new member received no partitions");
        assert!(
            moved * 100 / before.len() <= 60,
            "adding one member moved {moved} of {} partitions",
            before.len()
        );
    }
}
