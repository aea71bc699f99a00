use std::fmt::Display;
use std::hash::Hash;

use log::{debug, warn};

use super::{Error, Ring, RingDigest, VirtualPoint};

// One digest call feeds up to four table positions, amortizing the digest
// cost over the point density.
const MAX_WINDOWS_PER_DIGEST: usize = 4;

impl<T, D> Ring<T, D>
where
    T: Clone + Eq + Hash + Display,
    D: RingDigest,
{
    /// Add `node` to the ring with weight 1.
    pub fn add_node(&mut self, node: T) -> Result<(), Error> {
        self.add_weighted_node(node, 1)
    }

    /// Add `node` to the ring with the given `weight`.
    ///
    /// The new node's replica count is computed against the updated node
    /// count and total weight; existing nodes keep their points, so only the
    /// key ranges claimed by the new points are remapped. Returns
    /// [`Error::NodeExists`] if the node is already registered; remove it
    /// first to change its weight.
    pub fn add_weighted_node(&mut self, node: T, weight: u32) -> Result<(), Error> {
        if self.weights.contains_key(&node) {
            return Err(Error::NodeExists);
        }

        let node_count = self.weights.len() + 1;
        let total_weight = self.total_weight() + u64::from(weight);
        let replicas = self.replica_count(weight, node_count, total_weight);
        if replicas == 0 {
            warn!("node {node} with weight {weight} received zero virtual points");
        }

        let mut recorded = Vec::with_capacity(replicas * MAX_WINDOWS_PER_DIGEST);
        for replica in 0..replicas {
            for position in self.replica_positions(&node, replica) {
                if self.insert_point(position, &node) {
                    recorded.push(position);
                }
            }
        }

        debug!("added node {node}: {} virtual points", recorded.len());
        self.weights.insert(node.clone(), weight);
        self.points.insert(node, recorded);
        Ok(())
    }

    /// Remove `node` and exactly its recorded virtual points from the ring.
    ///
    /// Other nodes' replica counts are not rebalanced, so only the keys that
    /// belonged to the removed node are remapped. Returns
    /// [`Error::NodeNotFound`] if the node is not registered; the ring is
    /// left unchanged in that case.
    pub fn remove_node(&mut self, node: &T) -> Result<(), Error> {
        let recorded = self.points.remove(node).ok_or(Error::NodeNotFound)?;

        for position in recorded {
            if let Ok(index) = self.find_position(position) {
                self.table.remove(index);
            }
        }

        self.weights.remove(node);
        debug!("removed node {node}: {} virtual points remain", self.table.len());
        Ok(())
    }

    /// Returns the node owning `key`, or `None` if the ring is empty.
    ///
    /// The key's position is resolved to the smallest table position at or
    /// after it ("clockwise"); a key beyond the largest table position wraps
    /// around to the node owning the smallest one.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Option<&T> {
        if self.table.is_empty() {
            return None;
        }

        let index = self.table_index(self.key_position(key));
        Some(&self.table[index].node)
    }

    /// Ring position of an arbitrary key.
    ///
    /// Key lookup always uses the first digest window, regardless of how many
    /// windows node placement extracts, so results do not depend on the point
    /// density of any node.
    pub fn key_position(&self, key: impl AsRef<[u8]>) -> u32 {
        let digest = self.digest.digest(key.as_ref());
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    // Bulk construction: register all nodes first so replica counts are
    // computed against the full totals, derive every point, then sort once.
    pub(super) fn populate(&mut self, nodes: Vec<(T, u32)>) -> Result<(), Error> {
        if nodes.is_empty() {
            if self.config.strict {
                return Err(Error::EmptyRing);
            }
            return Ok(());
        }

        for (node, weight) in &nodes {
            if self.weights.insert(node.clone(), *weight).is_some() {
                return Err(Error::NodeExists);
            }
        }

        let node_count = self.weights.len();
        let total_weight = self.total_weight();

        for (node, weight) in &nodes {
            let replicas = self.replica_count(*weight, node_count, total_weight);
            if replicas == 0 {
                warn!("node {node} with weight {weight} received zero virtual points");
            }
            for replica in 0..replicas {
                for position in self.replica_positions(node, replica) {
                    self.table.push(VirtualPoint::new(position, node.clone()));
                }
            }
        }

        // single bulk sort; stable, so points keep insertion order within a
        // position and the collision policy below can pick the last writer
        self.table.sort();
        self.table.dedup_by(|later, earlier| {
            if later.position == earlier.position {
                warn!("position collision at {}, keeping the last inserted point", later.position);
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });

        let mut points: std::collections::HashMap<T, Vec<u32>> = self
            .weights
            .keys()
            .map(|node| (node.clone(), Vec::new()))
            .collect();
        for point in &self.table {
            if let Some(recorded) = points.get_mut(&point.node) {
                recorded.push(point.position);
            }
        }
        self.points = points;

        debug!(
            "ring built: {} nodes, {} virtual points",
            self.weights.len(),
            self.table.len()
        );
        Ok(())
    }

    // Derive up to four 32-bit positions from one digest of the replica label
    // "<node>_<replica>", reading non-overlapping 4-byte windows little
    // endian (byte 0 least significant).
    fn replica_positions(&self, node: &T, replica: usize) -> Vec<u32> {
        let label = format!("{node}_{replica}");
        let digest = self.digest.digest(label.as_bytes());
        let windows = (digest.len() / 4).min(MAX_WINDOWS_PER_DIGEST);

        (0..windows)
            .map(|window| {
                let offset = window * 4;
                u32::from_le_bytes([
                    digest[offset],
                    digest[offset + 1],
                    digest[offset + 2],
                    digest[offset + 3],
                ])
            })
            .collect()
    }

    // Insert one point into the sorted table, keeping positions unique.
    // Returns true if the point is now recorded for `node`. When two nodes
    // derive the same position the last writer owns it and the previous
    // owner's record drops the position; a node colliding with itself is
    // recorded once.
    fn insert_point(&mut self, position: u32, node: &T) -> bool {
        match self.find_position(position) {
            Ok(index) => {
                if self.table[index].node == *node {
                    return false;
                }

                warn!("position collision at {position}, keeping the last inserted point");
                let previous = self.table[index].node.clone();
                if let Some(recorded) = self.points.get_mut(&previous) {
                    recorded.retain(|p| *p != position);
                }
                self.table[index].node = node.clone();
                true
            }
            Err(index) => {
                self.table.insert(index, VirtualPoint::new(position, node.clone()));
                true
            }
        }
    }

    fn total_weight(&self) -> u64 {
        self.weights.values().copied().map(u64::from).sum()
    }

    // floor(base_points * node_count * weight / total_weight); the floor can
    // reach zero for very light nodes in a heavy cluster, which is reported
    // as a configuration warning by the callers rather than rounded up.
    fn replica_count(&self, weight: u32, node_count: usize, total_weight: u64) -> usize {
        if !self.config.weighted {
            return self.config.base_points;
        }
        if total_weight == 0 {
            return 0;
        }

        let scaled = self.config.base_points as u64 * node_count as u64 * u64::from(weight);
        (scaled / total_weight) as usize
    }

    fn find_position(&self, position: u32) -> Result<usize, usize> {
        self.table.binary_search_by(|point| point.position.cmp(&position))
    }

    // Table index owning `position`: the first entry at or after it, wrapping
    // to the start when the search runs off the end. Callers ensure the
    // table is not empty.
    pub(super) fn table_index(&self, position: u32) -> usize {
        match self.find_position(position) {
            Ok(index) => index,
            Err(index) if index == self.table.len() => 0,
            Err(index) => index,
        }
    }
}
