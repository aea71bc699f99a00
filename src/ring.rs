use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

#[cfg(feature = "derive")]
use serde::{Deserialize, Serialize};

mod crud;
pub mod digest;
mod iterator;

pub use digest::{Crc32Digest, Md5Digest, RingDigest, SipDigest};
pub use iterator::DistinctNodes;

/// Errors reported by ring construction and mutation.
///
/// Lookups never fail: an empty ring is a valid, queryable state and
/// resolves to `None` instead of an error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The node is already registered. Remove it first to change its weight.
    #[error("node is already present in the ring")]
    NodeExists,

    /// The node is not registered; the ring was left unchanged.
    #[error("node is not present in the ring")]
    NodeNotFound,

    /// Strict construction was requested with an empty node list.
    #[error("ring constructed without nodes in strict mode")]
    EmptyRing,

    /// The injected digest produces fewer than 4 bytes, so no 32-bit ring
    /// position can be sliced from it. Caught at construction, never at
    /// query time.
    #[error("digest output of {0} bytes is too short, at least 4 are required")]
    DigestTooShort(usize),
}

/// Constructor-time configuration of a [`Ring`].
///
/// * `base_points` - virtual-point density multiplier. A node of weight `w`
///   in a ring of `n` nodes with total weight `W` receives
///   `floor(base_points * n * w / W)` replicas, each replica contributing up
///   to four table positions. Higher values reduce variance in the key
///   distribution at the cost of table size.
/// * `weighted` - if false, every node receives a flat `base_points`
///   replicas and declared weights are ignored.
/// * `strict` - if true, constructing a ring without nodes is an error
///   instead of a valid empty ring.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "derive", derive(Serialize, Deserialize))]
pub struct RingConfig {
    pub base_points: usize,
    pub weighted: bool,
    pub strict: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            base_points: 40,
            weighted: true,
            strict: false,
        }
    }
}

impl RingConfig {
    pub fn new() -> RingConfig {
        RingConfig::default()
    }

    /// Set the virtual-point density multiplier.
    pub fn base_points(mut self, base_points: usize) -> RingConfig {
        self.base_points = base_points;
        self
    }

    /// Ignore declared weights and give every node a flat replica count.
    pub fn unweighted(mut self) -> RingConfig {
        self.weighted = false;
        self
    }

    /// Treat construction without nodes as an error.
    pub fn strict(mut self) -> RingConfig {
        self.strict = true;
        self
    }
}

// VirtualPoint is an internal struct encapsulating one synthetic position a
// node occupies on the ring. Several points per node smooth the key
// distribution.
#[derive(Clone, Debug)]
struct VirtualPoint<T> {
    position: u32,
    node: T,
}

impl<T> VirtualPoint<T> {
    fn new(position: u32, node: T) -> VirtualPoint<T> {
        VirtualPoint { position, node }
    }
}

// Implement `PartialEq`, `Eq`, `PartialOrd` and `Ord` by position only so
// the table can be sorted and binary searched
impl<T> PartialEq for VirtualPoint<T> {
    fn eq(&self, other: &VirtualPoint<T>) -> bool {
        self.position == other.position
    }
}

impl<T> Eq for VirtualPoint<T> {}

impl<T> PartialOrd for VirtualPoint<T> {
    fn partial_cmp(&self, other: &VirtualPoint<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for VirtualPoint<T> {
    fn cmp(&self, other: &VirtualPoint<T>) -> Ordering {
        self.position.cmp(&other.position)
    }
}

/// Ring maps an unbounded key space onto a small, dynamic set of nodes.
///
/// Each node is expanded into weighted virtual points placed on a 32-bit
/// circle; a key belongs to the node owning the first point at or after the
/// key's own position, wrapping around at the top. Adding or removing one
/// node only remaps the keys covered by that node's points.
///
/// The ring stores node identifiers and weights only, never connections.
#[derive(Clone, Debug)]
pub struct Ring<T, D = Md5Digest> {
    digest: D,
    config: RingConfig,
    weights: HashMap<T, u32>,
    points: HashMap<T, Vec<u32>>,
    table: Vec<VirtualPoint<T>>,
}

impl<T> Default for Ring<T> {
    fn default() -> Self {
        Ring {
            digest: Md5Digest,
            config: RingConfig::default(),
            weights: HashMap::new(),
            points: HashMap::new(),
            table: Vec::new(),
        }
    }
}

impl<T> Ring<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// Create an empty `Ring` with the default 128-bit digest.
    pub fn new(config: RingConfig) -> Result<Ring<T>, Error> {
        Ring::with_digest_and_nodes(config, Md5Digest, vec![])
    }

    /// Create a `Ring` containing `nodes`, all with weight 1.
    pub fn with_nodes(config: RingConfig, nodes: Vec<T>) -> Result<Ring<T>, Error> {
        let nodes = nodes.into_iter().map(|node| (node, 1)).collect();
        Ring::with_digest_and_nodes(config, Md5Digest, nodes)
    }

    /// Create a `Ring` containing `nodes` with their declared weights.
    pub fn with_weighted_nodes(config: RingConfig, nodes: Vec<(T, u32)>) -> Result<Ring<T>, Error> {
        Ring::with_digest_and_nodes(config, Md5Digest, nodes)
    }
}

impl<T, D> Ring<T, D>
where
    T: Clone + Eq + Hash + Display,
    D: RingDigest,
{
    /// Create an empty `Ring` which will use the given digest.
    pub fn with_digest(config: RingConfig, digest: D) -> Result<Ring<T, D>, Error> {
        Ring::with_digest_and_nodes(config, digest, vec![])
    }

    /// Create a `Ring` using the given digest, containing `nodes` with their
    /// declared weights.
    ///
    /// Returns [`Error::DigestTooShort`] if the digest cannot supply a 4-byte
    /// window, [`Error::EmptyRing`] if `nodes` is empty and the config is
    /// strict, and [`Error::NodeExists`] on duplicate identifiers in `nodes`.
    pub fn with_digest_and_nodes(
        config: RingConfig,
        digest: D,
        nodes: Vec<(T, u32)>,
    ) -> Result<Ring<T, D>, Error> {
        let output_len = digest.output_len();
        if output_len < 4 {
            return Err(Error::DigestTooShort(output_len));
        }

        let mut ring = Ring {
            digest,
            config,
            weights: HashMap::new(),
            points: HashMap::new(),
            table: Vec::new(),
        };
        ring.populate(nodes)?;
        Ok(ring)
    }
}

impl<T, D> Ring<T, D> {
    /// Number of distinct nodes currently registered.
    pub fn size(&self) -> usize {
        self.weights.len()
    }

    /// Returns true if no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of virtual points in the ring table.
    pub fn point_count(&self) -> usize {
        self.table.len()
    }

    /// Iterate over the registered node identifiers, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.weights.keys()
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }
}

impl<T, D> Ring<T, D>
where
    T: Eq + Hash,
{
    /// Declared weight of `node`, if registered.
    pub fn weight_of(&self, node: &T) -> Option<u32> {
        self.weights.get(node).copied()
    }
}
