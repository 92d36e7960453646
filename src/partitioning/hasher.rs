//! 64-bit key hashing for ring placement.

use std::hash::Hasher;
use twox_hash::XxHash64;

/// Seed shared by every replica; changing it re-keys the entire ring.
const RING_HASH_SEED: u64 = 0;

/// Hash arbitrary bytes to a 64-bit ring position.
///
/// The digest is a pure function of the input bytes, so every replica in
/// the fleet computes identical positions across process restarts.
pub fn sum64(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(RING_HASH_SEED);
    hasher.write(data);
    hasher.finish()
}
