use tracing::{debug, info, instrument, warn};

use crate::{
    cache::NodeCache,
    config::{DepthMismatchPolicy, RebuildStrategy, TreeConfig},
    data::DataBlockStore,
    hash::{capacity_for_depth, validate_depth, Blake3Hasher, Digest, LeafValue, MerkleHasher},
    proof::HashPath,
    serialization::{decode_node_cache, encode_node_cache},
    store::TreeStore,
    zero::ZeroHashTable,
    SparseMerkleError,
};

/// A sparse Merkle tree of fixed depth persisted as one blob.
///
/// Leaves are 64-byte values at indices `0..2^depth`; unwritten leaves hold
/// the zero value. The root is always derived from the node cache and is
/// never stored on its own.
///
/// Mutation takes `&mut self`: one instance has one writer. Use
/// [`SharedSparseMerkleTree`](crate::SharedSparseMerkleTree) to share a tree
/// between tasks.
#[derive(Debug)]
pub struct SparseMerkleTree<S, H = Blake3Hasher> {
    store: S,
    hasher: H,
    name: String,
    storage_key: String,
    config: TreeConfig,
    zeros: ZeroHashTable,
    data: DataBlockStore,
    cache: NodeCache,
}

impl<S: TreeStore, H: MerkleHasher + Default> SparseMerkleTree<S, H> {
    /// Open the tree called `name`, restoring it from `store` if it was
    /// persisted before, or creating and persisting an empty tree of `depth`.
    ///
    /// When a persisted tree exists its depth wins over `depth`.
    pub async fn open(
        store: S,
        name: impl Into<String>,
        depth: u8,
    ) -> Result<Self, SparseMerkleError> {
        Self::open_with_config(store, H::default(), name, depth, TreeConfig::default()).await
    }
}

impl<S: TreeStore, H: MerkleHasher> SparseMerkleTree<S, H> {
    /// Open with an explicit hasher and configuration.
    pub async fn open_with_config(
        store: S,
        hasher: H,
        name: impl Into<String>,
        depth: u8,
        config: TreeConfig,
    ) -> Result<Self, SparseMerkleError> {
        let name = name.into();
        Self::open_named(store, hasher, name, depth, config).await
    }

    #[instrument(
        name = "open_tree",
        skip(store, hasher, config),
        fields(key = tracing::field::Empty)
    )]
    async fn open_named(
        store: S,
        hasher: H,
        name: String,
        depth: u8,
        config: TreeConfig,
    ) -> Result<Self, SparseMerkleError> {
        validate_depth(depth)?;
        let storage_key = config.storage_key(&name);
        tracing::Span::current().record("key", storage_key.as_str());

        match store.get(&storage_key).await? {
            Some(blob) => {
                let cache = decode_node_cache(&blob)?;
                let persisted = cache.depth();
                if persisted != depth {
                    match config.depth_mismatch {
                        DepthMismatchPolicy::PersistedWins => warn!(
                            requested = depth,
                            persisted,
                            "persisted depth differs from requested depth, using persisted"
                        ),
                        DepthMismatchPolicy::Reject => {
                            return Err(SparseMerkleError::DepthMismatch {
                                requested: depth,
                                persisted,
                            });
                        }
                    }
                }
                let zeros = ZeroHashTable::build(persisted, &hasher)?;
                debug!(
                    depth = persisted,
                    nodes = cache.populated_nodes(),
                    leaves = cache.populated_leaves(),
                    "restored node cache"
                );
                Ok(Self {
                    store,
                    hasher,
                    name,
                    storage_key,
                    config,
                    zeros,
                    data: DataBlockStore::new(),
                    cache,
                })
            }
            None => {
                let zeros = ZeroHashTable::build(depth, &hasher)?;
                let mut tree = Self {
                    store,
                    hasher,
                    name,
                    storage_key,
                    config,
                    zeros,
                    data: DataBlockStore::new(),
                    cache: NodeCache::new(depth),
                };
                tree.cache.rebuild(&tree.data, &tree.hasher, &tree.zeros);
                tree.persist().await?;
                info!(depth, "initialised empty sparse merkle tree");
                Ok(tree)
            }
        }
    }

    /// Name the tree was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key the node cache is persisted under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Depth of the tree; the root sits at this level.
    pub fn depth(&self) -> u8 {
        self.cache.depth()
    }

    /// Number of leaf slots, `2^depth`.
    pub fn capacity(&self) -> u64 {
        capacity_for_depth(self.depth())
    }

    /// Configuration the tree was opened with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The hasher in use.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Empty-subtree digests for this depth.
    pub fn zero_hashes(&self) -> &ZeroHashTable {
        &self.zeros
    }

    /// The cached node digests.
    pub fn node_cache(&self) -> &NodeCache {
        &self.cache
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current root digest.
    pub fn root(&self) -> Digest {
        self.cache.root(&self.zeros)
    }

    /// Value written at `index` during this instance's lifetime.
    ///
    /// Values are not persisted, so a restored tree knows only digests.
    pub fn get_element(&self, index: u64) -> Option<&LeafValue> {
        self.data.get(index)
    }

    /// Leaf digest at `index`, or the zero leaf digest if unset.
    pub fn leaf_digest(&self, index: u64) -> Digest {
        *self.cache.resolve(0, index, &self.zeros)
    }

    /// Number of leaves with a cached digest.
    pub fn populated_leaves(&self) -> usize {
        self.cache.populated_leaves()
    }

    /// Hash path for the leaf at `index`.
    pub fn hash_path(&self, index: u64) -> Result<HashPath, SparseMerkleError> {
        self.check_index(index)?;
        Ok(self.cache.hash_path(index, &self.zeros))
    }

    /// Write `value` at `index`, rebuild and persist, and return the new root.
    ///
    /// If persisting fails the in-memory tree has already moved to the new
    /// root; the error is returned and the caller must not treat that root as
    /// durable until [`persist`](Self::persist) succeeds.
    #[instrument(skip(self, value), fields(tree = %self.name))]
    pub async fn update_element(
        &mut self,
        index: u64,
        value: LeafValue,
    ) -> Result<Digest, SparseMerkleError> {
        self.check_index(index)?;
        self.data.set(index, value);
        let hash_calls = match self.config.rebuild_strategy {
            RebuildStrategy::Full => self.cache.rebuild(&self.data, &self.hasher, &self.zeros),
            RebuildStrategy::Incremental => {
                self.cache.set_leaf(index, self.hasher.hash(&value));
                1 + self.cache.update_path(index, &self.hasher, &self.zeros)
            }
        };
        debug!(
            hash_calls,
            nodes = self.cache.populated_nodes(),
            strategy = ?self.config.rebuild_strategy,
            "rebuilt node cache"
        );
        self.persist().await?;
        Ok(self.root())
    }

    /// Like [`update_element`](Self::update_element) for an untyped slice,
    /// which must be exactly 64 bytes.
    pub async fn update_element_bytes(
        &mut self,
        index: u64,
        value: &[u8],
    ) -> Result<Digest, SparseMerkleError> {
        let value: LeafValue = value
            .try_into()
            .map_err(|_| SparseMerkleError::InvalidLeafLength(value.len()))?;
        self.update_element(index, value).await
    }

    /// Write the whole node cache to the store.
    #[instrument(skip(self), fields(key = %self.storage_key))]
    pub async fn persist(&self) -> Result<(), SparseMerkleError> {
        let blob = encode_node_cache(&self.cache)?;
        let bytes = blob.len();
        self.store.put(&self.storage_key, blob).await?;
        debug!(bytes, "persisted node cache");
        Ok(())
    }

    fn check_index(&self, index: u64) -> Result<(), SparseMerkleError> {
        if index >= self.capacity() {
            return Err(SparseMerkleError::IndexOutOfRange {
                index,
                depth: self.depth(),
            });
        }
        Ok(())
    }
}
