//! Sparse per-level node digests and the rebuild algorithms.
//!
//! Level 0 holds leaf digests, level `depth` holds the root at index 0. An
//! index missing from a level stands for the empty-subtree digest of that
//! level, so memory grows with the number of populated leaves rather than
//! with `2^depth`.
//!
//! Level 0 is the authoritative set of leaf digests: rebuilds recompute
//! levels `1..=depth` from it. This keeps leaves restored from a persisted
//! cache intact even though their values are not known to the instance.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use crate::{
    data::DataBlockStore,
    hash::{Digest, MerkleHasher},
    zero::ZeroHashTable,
};

/// Sparse mapping `(level, index) -> digest` for levels `0..=depth`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct NodeCache {
    levels: Vec<BTreeMap<u64, Digest>>,
}

impl NodeCache {
    /// Create an empty cache for a tree of the given depth.
    pub fn new(depth: u8) -> Self {
        Self {
            levels: vec![BTreeMap::new(); depth as usize + 1],
        }
    }

    pub(crate) fn from_levels(levels: Vec<BTreeMap<u64, Digest>>) -> Self {
        Self { levels }
    }

    pub(crate) fn levels(&self) -> &[BTreeMap<u64, Digest>] {
        &self.levels
    }

    /// Depth implied by the number of levels.
    pub fn depth(&self) -> u8 {
        (self.levels.len() - 1) as u8
    }

    /// Cached digest at `(level, index)`, if present.
    pub fn get(&self, level: u8, index: u64) -> Option<&Digest> {
        self.levels.get(level as usize)?.get(&index)
    }

    /// Logical digest at `(level, index)`: the cached one or the zero hash.
    pub fn resolve<'a>(&'a self, level: u8, index: u64, zeros: &'a ZeroHashTable) -> &'a Digest {
        let level = level as usize;
        self.levels[level]
            .get(&index)
            .unwrap_or_else(|| zeros.at(level))
    }

    /// All cached entries of one level, ordered by index.
    pub fn level(&self, level: u8) -> Option<&BTreeMap<u64, Digest>> {
        self.levels.get(level as usize)
    }

    /// Total number of cached digests across all levels.
    pub fn populated_nodes(&self) -> usize {
        self.levels.iter().map(BTreeMap::len).sum()
    }

    /// Number of cached leaf digests.
    pub fn populated_leaves(&self) -> usize {
        self.levels[0].len()
    }

    /// Root digest, or the empty-tree root if nothing is cached at the top.
    pub fn root(&self, zeros: &ZeroHashTable) -> Digest {
        *self.resolve(self.depth(), 0, zeros)
    }

    /// Store a leaf digest at level 0 without touching its ancestors.
    pub(crate) fn set_leaf(&mut self, index: u64, digest: Digest) {
        self.levels[0].insert(index, digest);
    }

    /// Recompute the cache from scratch.
    ///
    /// Every value in `data` is re-hashed into level 0, then each level above
    /// is rebuilt from the one below. A parent is computed once per sibling
    /// pair no matter which of the two children is visited first, so the
    /// result only depends on the set of populated indices.
    ///
    /// Returns the number of hash and compress calls.
    pub fn rebuild<H: MerkleHasher>(
        &mut self,
        data: &DataBlockStore,
        hasher: &H,
        zeros: &ZeroHashTable,
    ) -> u32 {
        let mut hash_calls = 0u32;
        for (index, value) in data.iter() {
            self.levels[0].insert(index, hasher.hash(value));
            hash_calls += 1;
        }

        for level in 1..self.levels.len() {
            let (lower, upper) = self.levels.split_at_mut(level);
            let children = &lower[level - 1];
            let parents = &mut upper[0];
            parents.clear();

            for (&index, digest) in children {
                let parent = index >> 1;
                // The parent entry doubles as the "pair processed" mark.
                if parents.contains_key(&parent) {
                    continue;
                }
                let sibling_digest = children
                    .get(&(index ^ 1))
                    .unwrap_or_else(|| zeros.at(level - 1));
                let (left, right) = if index & 1 == 0 {
                    (digest, sibling_digest)
                } else {
                    (sibling_digest, digest)
                };
                parents.insert(parent, hasher.compress(left, right));
                hash_calls += 1;
            }
        }
        hash_calls
    }

    /// Recompute only the ancestors of the leaf at `index`.
    ///
    /// The leaf digest must already be in level 0. Produces the same cache as
    /// [`rebuild`](Self::rebuild) for the same set of leaves. Returns the
    /// number of compress calls, which is always `depth`.
    pub fn update_path<H: MerkleHasher>(
        &mut self,
        index: u64,
        hasher: &H,
        zeros: &ZeroHashTable,
    ) -> u32 {
        let mut hash_calls = 0u32;
        let mut child = index;
        for level in 1..self.levels.len() {
            let children = &self.levels[level - 1];
            let zero = zeros.at(level - 1);
            let left = children.get(&(child & !1)).unwrap_or(zero);
            let right = children.get(&(child | 1)).unwrap_or(zero);
            let digest = hasher.compress(left, right);
            hash_calls += 1;
            child >>= 1;
            self.levels[level].insert(child, digest);
        }
        hash_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash::LeafValue, Blake3Hasher};

    fn leaf(byte: u8) -> LeafValue {
        [byte; 64]
    }

    fn setup(depth: u8) -> (Blake3Hasher, ZeroHashTable) {
        let hasher = Blake3Hasher;
        let zeros = ZeroHashTable::build(depth, &hasher).expect("valid depth");
        (hasher, zeros)
    }

    #[test]
    fn test_empty_cache_root_is_zero_root() {
        let (_, zeros) = setup(8);
        let cache = NodeCache::new(8);
        assert_eq!(cache.depth(), 8);
        assert_eq!(cache.root(&zeros), zeros.root());
        assert_eq!(cache.populated_nodes(), 0);
    }

    #[test]
    fn test_rebuild_single_leaf_depth_2() {
        let (hasher, zeros) = setup(2);
        let mut data = DataBlockStore::new();
        data.set(0, leaf(0xAA));

        let mut cache = NodeCache::new(2);
        let calls = cache.rebuild(&data, &hasher, &zeros);
        // 1 leaf hash + 1 compress per level
        assert_eq!(calls, 3);

        let leaf_digest = hasher.hash(&leaf(0xAA));
        let z0 = *zeros.at(0);
        let z1 = *zeros.at(1);
        let parent = hasher.compress(&leaf_digest, &z0);
        let root = hasher.compress(&parent, &z1);

        assert_eq!(cache.get(0, 0), Some(&leaf_digest));
        assert_eq!(cache.get(1, 0), Some(&parent));
        assert_eq!(cache.root(&zeros), root);
        assert_eq!(cache.populated_nodes(), 3);
    }

    #[test]
    fn test_rebuild_pairs_siblings_once() {
        let (hasher, zeros) = setup(3);
        let mut data = DataBlockStore::new();
        data.set(0, leaf(1));
        data.set(1, leaf(2));

        let mut cache = NodeCache::new(3);
        let calls = cache.rebuild(&data, &hasher, &zeros);
        // 2 leaf hashes + one compress per level above
        assert_eq!(calls, 5);
        assert_eq!(cache.level(1).expect("level 1").len(), 1);
        assert_eq!(
            cache.get(1, 0),
            Some(&hasher.compress(&hasher.hash(&leaf(1)), &hasher.hash(&leaf(2))))
        );
    }

    #[test]
    fn test_odd_index_is_right_child() {
        let (hasher, zeros) = setup(1);
        let mut data = DataBlockStore::new();
        data.set(1, leaf(7));

        let mut cache = NodeCache::new(1);
        cache.rebuild(&data, &hasher, &zeros);
        assert_eq!(
            cache.root(&zeros),
            hasher.compress(zeros.at(0), &hasher.hash(&leaf(7)))
        );
    }

    #[test]
    fn test_update_path_matches_rebuild() {
        let (hasher, zeros) = setup(10);
        let writes = [(3u64, leaf(1)), (1000, leaf(2)), (2, leaf(3)), (3, leaf(4))];

        let mut data = DataBlockStore::new();
        let mut incremental = NodeCache::new(10);
        for (index, value) in writes {
            data.set(index, value);
            incremental.set_leaf(index, hasher.hash(&value));
            assert_eq!(incremental.update_path(index, &hasher, &zeros), 10);
        }

        let mut full = NodeCache::new(10);
        full.rebuild(&data, &hasher, &zeros);

        assert_eq!(incremental, full);
        assert_eq!(incremental.root(&zeros), full.root(&zeros));
    }

    #[test]
    fn test_rebuild_keeps_leaves_without_values() {
        let (hasher, zeros) = setup(4);
        let restored_digest = hasher.hash(&leaf(9));

        let mut cache = NodeCache::new(4);
        cache.set_leaf(5, restored_digest);
        let mut data = DataBlockStore::new();
        data.set(12, leaf(3));
        cache.rebuild(&data, &hasher, &zeros);

        let mut expected = NodeCache::new(4);
        let mut both = DataBlockStore::new();
        both.set(5, leaf(9));
        both.set(12, leaf(3));
        expected.rebuild(&both, &hasher, &zeros);

        assert_eq!(cache.root(&zeros), expected.root(&zeros));
    }
}
