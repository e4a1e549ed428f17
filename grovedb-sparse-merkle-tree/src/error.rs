use thiserror::Error;

/// Errors from sparse Merkle tree operations.
#[derive(Debug, Error)]
pub enum SparseMerkleError {
    /// Depth outside the supported range `[1, 32]`.
    #[error("depth must be between 1 and 32, got {0}")]
    InvalidDepth(u8),
    /// Leaf index does not fit in a tree of the given depth.
    #[error("index {index} is out of range for depth {depth} (capacity 2^{depth})")]
    IndexOutOfRange {
        /// The rejected leaf index.
        index: u64,
        /// Depth of the tree.
        depth: u8,
    },
    /// Leaf values are exactly 64 bytes.
    #[error("leaf value must be 64 bytes, got {0}")]
    InvalidLeafLength(usize),
    /// The persisted tree has a different depth than the caller asked for.
    #[error("requested depth {requested} but persisted tree has depth {persisted}")]
    DepthMismatch {
        /// Depth passed to `open`.
        requested: u8,
        /// Depth recovered from the persisted node cache.
        persisted: u8,
    },
    /// A persisted blob failed structural validation.
    #[error("corrupted node cache: {0}")]
    CorruptedData(String),
    /// The backing store failed a read or a write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by [`TreeStore`](crate::TreeStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure from a filesystem-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}
