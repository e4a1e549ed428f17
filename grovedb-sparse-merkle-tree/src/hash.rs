//! Digest types and the hash/compress primitive.

use sha2::{Digest as _, Sha256};

use crate::SparseMerkleError;

/// A 32-byte node digest.
pub type Digest = [u8; 32];

/// Size in bytes of every leaf value.
pub const LEAF_VALUE_SIZE: usize = 64;

/// A leaf value stored at a level-0 index.
pub type LeafValue = [u8; LEAF_VALUE_SIZE];

/// The value of every leaf that was never written.
pub const ZERO_LEAF: LeafValue = [0u8; LEAF_VALUE_SIZE];

/// Smallest supported tree depth.
pub const MIN_DEPTH: u8 = 1;

/// Largest supported tree depth.
pub const MAX_DEPTH: u8 = 32;

/// Hash primitive used to build the tree.
///
/// `hash` turns a leaf value into a level-0 digest; `compress` combines a
/// left and right child digest into their parent.
pub trait MerkleHasher: Send + Sync {
    /// Hash arbitrary bytes into a digest.
    fn hash(&self, bytes: &[u8]) -> Digest;

    /// Combine two child digests, ordered by index, into the parent digest.
    fn compress(&self, left: &Digest, right: &Digest) -> Digest;
}

/// Blake3 hasher: `hash = blake3(bytes)`, `compress = blake3(left || right)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl MerkleHasher for Blake3Hasher {
    fn hash(&self, bytes: &[u8]) -> Digest {
        *blake3::hash(bytes).as_bytes()
    }

    fn compress(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        *hasher.finalize().as_bytes()
    }
}

/// SHA-256 hasher: `hash = sha256(bytes)`, `compress = sha256(left || right)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl MerkleHasher for Sha256Hasher {
    fn hash(&self, bytes: &[u8]) -> Digest {
        Sha256::digest(bytes).into()
    }

    fn compress(&self, left: &Digest, right: &Digest) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(left);
        hasher.update(right);
        hasher.finalize().into()
    }
}

/// Validate that depth is in the allowed range [1, 32].
pub(crate) fn validate_depth(depth: u8) -> Result<(), SparseMerkleError> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(SparseMerkleError::InvalidDepth(depth));
    }
    Ok(())
}

/// Number of leaf slots in a tree of the given depth.
pub(crate) fn capacity_for_depth(depth: u8) -> u64 {
    1u64 << depth
}
