use std::fmt::Display;
use std::hash::Hash;

use super::{Ring, RingDigest, VirtualPoint};

/// Lazy clockwise walk over the ring starting at a key's position.
///
/// Yields each node once, at its first-owned point on the walk, and
/// terminates after wrapping around the table exactly once. Dropping the
/// iterator early costs nothing for the remainder.
pub struct DistinctNodes<'a, T> {
    table: &'a [VirtualPoint<T>],
    start: usize,
    offset: usize,
    seen: Vec<&'a T>,
}

impl<'a, T> Iterator for DistinctNodes<'a, T>
where
    T: PartialEq,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.table.len() {
            let point = &self.table[(self.start + self.offset) % self.table.len()];
            self.offset += 1;

            if !self.seen.contains(&&point.node) {
                self.seen.push(&point.node);
                return Some(&point.node);
            }
        }
        None
    }
}

impl<T, D> Ring<T, D>
where
    T: Clone + Eq + Hash + Display,
    D: RingDigest,
{
    /// Walk the ring clockwise from `key`'s position, yielding the ordered,
    /// deduplicated sequence of nodes: the key's owner first, then each next
    /// distinct node. Used to pick replication or fallback targets.
    ///
    /// Every call recomputes the walk from scratch against the current
    /// table. On an empty ring the sequence is empty.
    pub fn iter_distinct(&self, key: impl AsRef<[u8]>) -> DistinctNodes<'_, T> {
        let start = if self.table.is_empty() {
            0
        } else {
            self.table_index(self.key_position(key))
        };

        DistinctNodes {
            table: &self.table,
            start,
            offset: 0,
            seen: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::{Ring, RingConfig, RingDigest};

    // Same hand-computable digest as the crud tests: replica labels land on
    //   "A_0" -> 143  "B_0" -> 144  "C_0" -> 145
    //   "A_1" -> 146  "B_1" -> 147  "C_1" -> 148
    // and a single-byte key [k] lands on position k.
    #[derive(Clone, Debug, Default)]
    struct MockDigest;

    impl RingDigest for MockDigest {
        fn output_len(&self) -> usize {
            4
        }

        fn digest(&self, input: &[u8]) -> Vec<u8> {
            let sum = input
                .iter()
                .enumerate()
                .map(|(i, b)| (i as u32 + 1) * u32::from(*b))
                .sum::<u32>();
            vec![(sum % 256) as u8, 0, 0, 0]
        }
    }

    fn mock_ring() -> Ring<&'static str, MockDigest> {
        let config = RingConfig::new().base_points(2).unweighted();
        Ring::with_digest_and_nodes(
            config,
            MockDigest,
            vec![("A", 1), ("B", 1), ("C", 1)],
        )
        .unwrap()
    }

    #[test]
    fn walk_starts_at_the_keys_owner() {
        let ring = mock_ring();

        let order: Vec<&&str> = ring.iter_distinct([0u8]).collect();
        assert_eq!(order, vec![&"A", &"B", &"C"]);

        let order: Vec<&&str> = ring.iter_distinct([144u8]).collect();
        assert_eq!(order, vec![&"B", &"C", &"A"]);

        let order: Vec<&&str> = ring.iter_distinct([145u8]).collect();
        assert_eq!(order, vec![&"C", &"A", &"B"]);
    }

    #[test]
    fn walk_wraps_once_past_the_largest_position() {
        let ring = mock_ring();

        // beyond 148 the walk wraps to the smallest position
        let order: Vec<&&str> = ring.iter_distinct([200u8]).collect();
        assert_eq!(order, vec![&"A", &"B", &"C"]);
    }

    #[test]
    fn each_node_is_yielded_at_most_once() {
        let ring = mock_ring();

        // starting at 146 the raw point walk is A B C A B C; the node walk
        // dedups to one occurrence each
        let order: Vec<&&str> = ring.iter_distinct([146u8]).collect();
        assert_eq!(order, vec![&"A", &"B", &"C"]);
        assert_eq!(order.len(), ring.size());
    }

    #[test]
    fn walk_is_restartable() {
        let ring = mock_ring();

        let first: Vec<&&str> = ring.iter_distinct([144u8]).collect();
        let second: Vec<&&str> = ring.iter_distinct([144u8]).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn walk_can_be_abandoned_early() {
        let ring = mock_ring();

        let primary: Vec<&&str> = ring.iter_distinct([144u8]).take(1).collect();
        assert_eq!(primary, vec![&"B"]);

        let fallback: Vec<&&str> = ring.iter_distinct([144u8]).skip(1).take(1).collect();
        assert_eq!(fallback, vec![&"C"]);
    }

    #[test]
    fn empty_ring_yields_nothing() {
        let ring: Ring<String> = Ring::default();
        assert_eq!(ring.iter_distinct("x").count(), 0);
    }
}
