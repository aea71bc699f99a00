//! A weighted consistent hash ring for sharding keys across a dynamic set of nodes.
//!
//! [`Ring`] deterministically maps arbitrary byte-string keys onto registered
//! nodes while minimizing remapping when nodes join or leave: each node is
//! expanded into virtual points on a 32-bit circle in proportion to its
//! weight, and a key belongs to the node owning the first point clockwise of
//! the key's own position.
//!
//! Positions are derived from a configurable digest ([`RingDigest`]): a
//! replica label `"<node>_<j>"` is digested and sliced into up to four
//! little-endian 4-byte windows, so one digest call feeds four table
//! positions. MD5 is the default; CRC32 and SipHash-2-4 are provided for
//! lower CPU cost.
//!
//! The ring performs no I/O of its own. It decides *which* node owns a key;
//! talking to that node is the caller's business.
//!
//! ```
//! use hashring_continuum::{Ring, RingConfig};
//!
//! let mut ring = Ring::with_weighted_nodes(
//!     RingConfig::new(),
//!     vec![("10.0.0.1:11211".to_string(), 1), ("10.0.0.2:11211".to_string(), 2)],
//! )
//! .unwrap();
//!
//! let primary = ring.lookup("user:42").unwrap().clone();
//!
//! // walk the ring for fallback targets: primary first, then the next
//! // distinct nodes clockwise
//! let targets: Vec<_> = ring.iter_distinct("user:42").collect();
//! assert_eq!(*targets[0], primary);
//!
//! ring.remove_node(&primary).unwrap();
//! assert!(ring.lookup("user:42").is_some());
//! ```

use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

pub mod ring;

pub use ring::{
    Crc32Digest, DistinctNodes, Error, Md5Digest, Ring, RingConfig, RingDigest, SipDigest,
};

/// Shared handle over a [`Ring`] for concurrent readers racing occasional
/// writers.
///
/// The ring is published as an immutable snapshot behind an `Arc`. Readers
/// clone the `Arc` under a read lock and query the snapshot without holding
/// any lock; writers rebuild a copy and swap it in under the write lock. A
/// reader therefore observes either the pre-mutation or the fully rebuilt
/// table, never an intermediate state.
///
/// A snapshot taken before a mutation keeps answering from the old table;
/// take a fresh one (or go through [`SharedRing::lookup`]) to observe the
/// change.
pub struct SharedRing<T, D = Md5Digest> {
    inner: RwLock<Arc<Ring<T, D>>>,
}

impl<T, D> SharedRing<T, D>
where
    T: Clone + Eq + Hash + Display,
    D: RingDigest + Clone,
{
    pub fn new(ring: Ring<T, D>) -> SharedRing<T, D> {
        SharedRing {
            inner: RwLock::new(Arc::new(ring)),
        }
    }

    /// The current immutable snapshot. Queries against it are lock-free and
    /// see a frozen table.
    pub fn snapshot(&self) -> Arc<Ring<T, D>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Owner of `key` in the current snapshot, or `None` on an empty ring.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<T> {
        self.snapshot().lookup(key).cloned()
    }

    /// Number of distinct nodes in the current snapshot.
    pub fn size(&self) -> usize {
        self.snapshot().size()
    }

    /// Add `node` with weight 1 and publish the rebuilt table.
    pub fn add_node(&self, node: T) -> Result<(), Error> {
        self.mutate(|ring| ring.add_node(node))
    }

    /// Add `node` with the given `weight` and publish the rebuilt table.
    pub fn add_weighted_node(&self, node: T, weight: u32) -> Result<(), Error> {
        self.mutate(|ring| ring.add_weighted_node(node, weight))
    }

    /// Remove `node` and publish the rebuilt table. On error nothing is
    /// published and readers keep the current table.
    pub fn remove_node(&self, node: &T) -> Result<(), Error> {
        self.mutate(|ring| ring.remove_node(node))
    }

    // Copy-on-write: rebuild on a private copy, publish with one pointer
    // swap. The write lock is held only for the rebuild, never across any
    // reader's use of a snapshot.
    fn mutate(&self, op: impl FnOnce(&mut Ring<T, D>) -> Result<(), Error>) -> Result<(), Error> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        op(&mut next)?;
        *guard = Arc::new(next);
        Ok(())
    }
}

impl<T> Default for SharedRing<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        SharedRing::new(Ring::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::{Error, Ring, RingConfig, SharedRing};

    fn shared_ring(nodes: &[&str]) -> SharedRing<String> {
        let nodes = nodes.iter().map(|n| n.to_string()).collect();
        SharedRing::new(Ring::with_nodes(RingConfig::new(), nodes).unwrap())
    }

    #[test]
    fn snapshots_are_isolated_from_later_mutations() {
        let shared = shared_ring(&["A", "B"]);
        let before = shared.snapshot();

        shared.remove_node(&"A".to_string()).unwrap();

        assert_eq!(before.size(), 2);
        assert_eq!(shared.size(), 1);
        assert_eq!(shared.lookup("some key"), Some("B".to_string()));
    }

    #[test]
    fn failed_mutations_publish_nothing() {
        let shared = shared_ring(&["A"]);

        assert_eq!(shared.add_node("A".to_string()), Err(Error::NodeExists));
        assert_eq!(
            shared.remove_node(&"missing".to_string()),
            Err(Error::NodeNotFound)
        );
        assert_eq!(shared.size(), 1);
    }

    #[test]
    fn readers_race_a_writer_without_observing_partial_state() {
        let shared = Arc::new(shared_ring(&["A", "B", "C"]));
        let candidates = ["A", "B", "C", "D"];

        let readers: Vec<_> = (0..4)
            .map(|reader| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..1000 {
                        let owner = shared.lookup(format!("key_{reader}_{i}")).unwrap();
                        assert!(candidates.contains(&owner.as_str()));

                        // a snapshot always covers a full, sorted table
                        let snapshot = shared.snapshot();
                        assert_eq!(
                            snapshot.iter_distinct(format!("key_{reader}_{i}")).count(),
                            snapshot.size()
                        );
                    }
                })
            })
            .collect();

        for _ in 0..10 {
            shared.add_node("D".to_string()).unwrap();
            shared.remove_node(&"D".to_string()).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn empty_shared_ring_answers_none() {
        let shared: SharedRing<String> = SharedRing::default();
        assert_eq!(shared.lookup("x"), None);
        assert_eq!(shared.size(), 0);
    }
}
