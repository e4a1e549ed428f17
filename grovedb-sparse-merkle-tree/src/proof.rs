//! Hash paths: the sibling digests needed to recompute the root from one leaf.
//!
//! A path for a tree of depth `d` holds exactly `d` `(left, right)` pairs,
//! leaf level first. Pair `i` contains the node on the leaf's ancestor chain
//! at level `i` and its sibling, ordered by index. The root itself is never
//! part of the path.

use bincode::{Decode, Encode};

use crate::{
    cache::NodeCache,
    hash::{Digest, MerkleHasher},
    zero::ZeroHashTable,
    SparseMerkleError,
};

/// Ordered `(left, right)` digest pairs from the leaf level up to just below
/// the root.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct HashPath {
    pairs: Vec<(Digest, Digest)>,
}

impl HashPath {
    /// Number of pairs, equal to the tree depth.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the path has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The pairs, leaf level first.
    pub fn pairs(&self) -> &[(Digest, Digest)] {
        &self.pairs
    }

    /// Iterate over the pairs, leaf level first.
    pub fn iter(&self) -> impl Iterator<Item = &(Digest, Digest)> {
        self.pairs.iter()
    }

    /// Consume the path and return its pairs.
    pub fn into_pairs(self) -> Vec<(Digest, Digest)> {
        self.pairs
    }

    /// Fold the path bottom-up starting from `leaf_digest` at `index`.
    ///
    /// At each level the running digest replaces the side of the pair that
    /// `index` occupies and the pair is compressed. The result equals the
    /// tree root when the path was produced for `index` and `leaf_digest` is
    /// that leaf's digest.
    pub fn fold_root<H: MerkleHasher>(
        &self,
        leaf_digest: &Digest,
        index: u64,
        hasher: &H,
    ) -> Digest {
        let mut current = *leaf_digest;
        let mut index = index;
        for (left, right) in &self.pairs {
            current = if index & 1 == 0 {
                hasher.compress(&current, right)
            } else {
                hasher.compress(left, &current)
            };
            index >>= 1;
        }
        current
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, SparseMerkleError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| SparseMerkleError::CorruptedData(format!("hash path encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    ///
    /// Rejects paths longer than the maximum tree depth.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self, SparseMerkleError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<{ 64 * 1024 }>();
        let (path, _): (Self, _) = bincode::decode_from_slice(bytes, config).map_err(|e| {
            SparseMerkleError::CorruptedData(format!("hash path decode error: {}", e))
        })?;
        if path.pairs.is_empty() || path.pairs.len() > crate::MAX_DEPTH as usize {
            return Err(SparseMerkleError::CorruptedData(format!(
                "hash path has {} pairs (must be 1..=32)",
                path.pairs.len()
            )));
        }
        Ok(path)
    }
}

impl NodeCache {
    /// Build the hash path for the leaf at `index`.
    ///
    /// The index must be below `2^depth`; callers validate it.
    pub fn hash_path(&self, index: u64, zeros: &ZeroHashTable) -> HashPath {
        let depth = self.depth();
        let mut pairs = Vec::with_capacity(depth as usize);
        let mut index = index;
        for level in 0..depth {
            let own = *self.resolve(level, index, zeros);
            let sibling = *self.resolve(level, index ^ 1, zeros);
            let pair = if index & 1 == 0 {
                (own, sibling)
            } else {
                (sibling, own)
            };
            pairs.push(pair);
            index >>= 1;
        }
        HashPath { pairs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::DataBlockStore, Blake3Hasher};

    fn populated(depth: u8, leaves: &[(u64, u8)]) -> (NodeCache, ZeroHashTable, Blake3Hasher) {
        let hasher = Blake3Hasher;
        let zeros = ZeroHashTable::build(depth, &hasher).expect("valid depth");
        let mut data = DataBlockStore::new();
        for &(index, byte) in leaves {
            data.set(index, [byte; 64]);
        }
        let mut cache = NodeCache::new(depth);
        cache.rebuild(&data, &hasher, &zeros);
        (cache, zeros, hasher)
    }

    #[test]
    fn test_path_length_equals_depth() {
        let (cache, zeros, _) = populated(7, &[(3, 1)]);
        let path = cache.hash_path(3, &zeros);
        assert_eq!(path.len(), 7);
        assert!(!path.is_empty());
    }

    #[test]
    fn test_empty_tree_path_is_zero_pairs() {
        let (cache, zeros, hasher) = populated(5, &[]);
        let path = cache.hash_path(17, &zeros);
        for (level, (left, right)) in path.iter().enumerate() {
            assert_eq!(left, zeros.at(level));
            assert_eq!(right, zeros.at(level));
        }
        assert_eq!(path.fold_root(zeros.at(0), 17, &hasher), zeros.root());
    }

    #[test]
    fn test_fold_reproduces_root_for_every_leaf() {
        let (cache, zeros, hasher) = populated(4, &[(0, 1), (5, 2), (6, 3), (15, 4)]);
        let root = cache.root(&zeros);
        for index in 0..16u64 {
            let path = cache.hash_path(index, &zeros);
            let leaf = *cache.resolve(0, index, &zeros);
            assert_eq!(path.fold_root(&leaf, index, &hasher), root, "index {}", index);
        }
    }

    #[test]
    fn test_path_orders_pair_by_index() {
        let (cache, zeros, hasher) = populated(2, &[(1, 0xAB)]);
        let path = cache.hash_path(1, &zeros);
        let leaf = hasher.hash(&[0xAB; 64]);
        assert_eq!(path.pairs()[0], (*zeros.at(0), leaf));
        assert_eq!(path.pairs()[1], (hasher.compress(zeros.at(0), &leaf), *zeros.at(1)));
    }

    #[test]
    fn test_encode_decode() {
        let (cache, zeros, _) = populated(6, &[(9, 1), (40, 2)]);
        let path = cache.hash_path(9, &zeros);
        let bytes = path.encode_to_vec().expect("encode");
        let decoded = HashPath::decode_from_slice(&bytes).expect("decode");
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_decode_rejects_empty_path() {
        let empty = HashPath { pairs: Vec::new() };
        let bytes = empty.encode_to_vec().expect("encode");
        assert!(HashPath::decode_from_slice(&bytes).is_err());
    }
}
