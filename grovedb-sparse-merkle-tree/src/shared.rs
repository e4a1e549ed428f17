//! Single-writer wrapper for sharing a tree between tasks.
//!
//! Updates are serialized through an async mutex held across the rebuild and
//! the persistence write. Reads never wait for that mutex: they use the node
//! cache published by the last update whose write was acknowledged, so a
//! reader sees either the state before an update or after it, and never a
//! root that is not yet durable.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::{
    cache::NodeCache,
    hash::{capacity_for_depth, Blake3Hasher, Digest, LeafValue, MerkleHasher},
    proof::HashPath,
    store::TreeStore,
    tree::SparseMerkleTree,
    zero::ZeroHashTable,
    SparseMerkleError,
};

/// A [`SparseMerkleTree`] that can be shared by reference across tasks.
pub struct SharedSparseMerkleTree<S, H = Blake3Hasher> {
    writer: Mutex<SparseMerkleTree<S, H>>,
    published: RwLock<Arc<NodeCache>>,
    zeros: ZeroHashTable,
}

impl<S: TreeStore, H: MerkleHasher + Default> SharedSparseMerkleTree<S, H> {
    /// Open the tree and wrap it. See [`SparseMerkleTree::open`].
    pub async fn open(
        store: S,
        name: impl Into<String>,
        depth: u8,
    ) -> Result<Self, SparseMerkleError> {
        Ok(Self::new(SparseMerkleTree::open(store, name, depth).await?))
    }
}

impl<S: TreeStore, H: MerkleHasher> SharedSparseMerkleTree<S, H> {
    /// Wrap an open tree. Its current cache is published as-is.
    pub fn new(tree: SparseMerkleTree<S, H>) -> Self {
        let published = RwLock::new(Arc::new(tree.node_cache().clone()));
        let zeros = tree.zero_hashes().clone();
        Self {
            writer: Mutex::new(tree),
            published,
            zeros,
        }
    }

    /// Depth of the tree.
    pub fn depth(&self) -> u8 {
        self.zeros.depth()
    }

    /// Last published node cache.
    pub fn snapshot(&self) -> Arc<NodeCache> {
        self.published.read().clone()
    }

    /// Root of the last published node cache.
    pub fn root(&self) -> Digest {
        self.snapshot().root(&self.zeros)
    }

    /// Hash path against the last published node cache.
    pub fn hash_path(&self, index: u64) -> Result<HashPath, SparseMerkleError> {
        if index >= capacity_for_depth(self.depth()) {
            return Err(SparseMerkleError::IndexOutOfRange {
                index,
                depth: self.depth(),
            });
        }
        Ok(self.snapshot().hash_path(index, &self.zeros))
    }

    /// Apply an update and publish the new cache once it is persisted.
    ///
    /// On a persistence failure nothing is published, and readers keep seeing
    /// the previous durable state.
    pub async fn update_element(
        &self,
        index: u64,
        value: LeafValue,
    ) -> Result<Digest, SparseMerkleError> {
        let mut tree = self.writer.lock().await;
        let root = tree.update_element(index, value).await?;
        self.publish(&tree);
        Ok(root)
    }

    /// Retry persisting the writer's current state and publish it on success.
    pub async fn persist(&self) -> Result<(), SparseMerkleError> {
        let tree = self.writer.lock().await;
        tree.persist().await?;
        self.publish(&tree);
        Ok(())
    }

    /// Unwrap the inner tree.
    pub fn into_inner(self) -> SparseMerkleTree<S, H> {
        self.writer.into_inner()
    }

    fn publish(&self, tree: &SparseMerkleTree<S, H>) {
        *self.published.write() = Arc::new(tree.node_cache().clone());
    }
}
