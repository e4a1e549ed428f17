use crate::{
    hash::{validate_depth, Digest, MerkleHasher, ZERO_LEAF},
    SparseMerkleError,
};

/// Default digest of an empty subtree at every level.
///
/// `Z[0] = hash(zero64)` and `Z[i] = compress(Z[i-1], Z[i-1])`, so `Z[depth]`
/// is the root of a tree with no leaves written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroHashTable {
    digests: Vec<Digest>,
}

impl ZeroHashTable {
    /// Build the table for a tree of the given depth.
    pub fn build<H: MerkleHasher>(depth: u8, hasher: &H) -> Result<Self, SparseMerkleError> {
        validate_depth(depth)?;
        let mut digests = Vec::with_capacity(depth as usize + 1);
        let mut current = hasher.hash(&ZERO_LEAF);
        digests.push(current);
        for _ in 1..=depth {
            current = hasher.compress(&current, &current);
            digests.push(current);
        }
        Ok(Self { digests })
    }

    /// Depth the table was built for.
    pub fn depth(&self) -> u8 {
        (self.digests.len() - 1) as u8
    }

    /// Empty-subtree digest at `level`, or `None` above the root.
    pub fn get(&self, level: u8) -> Option<&Digest> {
        self.digests.get(level as usize)
    }

    /// Root of an empty tree.
    pub fn root(&self) -> Digest {
        self.digests[self.digests.len() - 1]
    }

    /// All digests, leaf level first.
    pub fn as_slice(&self) -> &[Digest] {
        &self.digests
    }

    /// Level must be `<= depth`; every caller iterates levels of a cache built
    /// for the same depth.
    pub(crate) fn at(&self, level: usize) -> &Digest {
        &self.digests[level]
    }
}
