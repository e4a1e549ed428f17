//! Sparse fixed-depth Merkle tree.
//!
//! A tree of depth `d` (1 to 32) has `2^d` leaf slots, each holding a
//! 64-byte value. Unwritten leaves hold 64 zero bytes, and any subtree
//! without written leaves hashes to a precomputed zero digest for its level,
//! so only the ancestor chains of written leaves are ever stored:
//!
//! - leaf digest: `hash(value)`
//! - internal node: `compress(left, right)`
//! - empty subtree at level `i`: `Z[i]`, with `Z[0] = hash(zero64)` and
//!   `Z[i] = compress(Z[i-1], Z[i-1])`
//!
//! # Core types
//!
//! - [`SparseMerkleTree`]: open/restore, update, root and hash paths.
//! - [`SharedSparseMerkleTree`]: single writer, lock-free snapshot reads.
//! - [`NodeCache`]: sparse `(level, index) -> digest` map and its rebuild.
//! - [`ZeroHashTable`]: per-level empty subtree digests.
//! - [`HashPath`]: sibling pairs from a leaf up to just below the root.
//!
//! # Persistence
//!
//! The node cache, and only the node cache, is written as one blob per tree
//! through the async [`TreeStore`] trait. [`MemTreeStore`] and (with the
//! `fs_store` feature) [`FsTreeStore`] are provided.

#![warn(missing_docs)]

mod cache;
mod config;
mod data;
mod error;
mod hash;
mod proof;
mod serialization;
mod shared;
mod store;
mod tree;
mod zero;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cache::NodeCache;
pub use config::{DepthMismatchPolicy, RebuildStrategy, TreeConfig};
pub use data::DataBlockStore;
pub use error::{SparseMerkleError, StoreError};
pub use hash::{
    Blake3Hasher, Digest, LeafValue, MerkleHasher, Sha256Hasher, LEAF_VALUE_SIZE, MAX_DEPTH,
    MIN_DEPTH, ZERO_LEAF,
};
pub use proof::HashPath;
pub use serialization::{decode_node_cache, encode_node_cache};
pub use shared::SharedSparseMerkleTree;
#[cfg(feature = "fs_store")]
pub use store::FsTreeStore;
pub use store::{MemTreeStore, TreeStore};
pub use tree::SparseMerkleTree;
pub use zero::ZeroHashTable;
