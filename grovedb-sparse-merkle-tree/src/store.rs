//! Blob store seam for node cache persistence.
//!
//! A tree persists exactly one blob under one key. The store only needs
//! `get` and `put`; both may suspend. `Ok(None)` from `get` means "nothing
//! persisted yet" and is the only outcome that starts a fresh tree. Errors
//! are never mistaken for absence.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::StoreError;

/// Key-value store holding one serialized node cache per tree.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Fetch the blob stored under `key`, or `None` if nothing was stored.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `blob` under `key`, replacing any previous blob.
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: TreeStore + ?Sized> TreeStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, blob).await
    }
}

/// In-memory [`TreeStore`].
///
/// Clones share the same underlying map, so a test can hand one clone to a
/// tree and reopen from another.
#[derive(Debug, Clone, Default)]
pub struct MemTreeStore {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemTreeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether no blob is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Whether a blob is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Copy of the blob stored under `key`.
    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Replace the blob under `key` directly, bypassing any tree.
    pub fn insert_blob(&self, key: impl Into<String>, blob: Vec<u8>) {
        self.data.write().insert(key.into(), blob);
    }
}

#[async_trait]
impl TreeStore for MemTreeStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        self.data.write().insert(key.to_string(), blob);
        Ok(())
    }
}

#[cfg(feature = "fs_store")]
pub use fs::FsTreeStore;

#[cfg(feature = "fs_store")]
mod fs {
    use std::{io, path::PathBuf};

    use async_trait::async_trait;
    use tracing::debug;

    use super::TreeStore;
    use crate::StoreError;

    const BLOB_EXTENSION: &str = "smt";

    /// Filesystem [`TreeStore`]: one file per key under a root directory.
    ///
    /// File names are the hex-encoded key, so any key string is safe to use.
    /// Writes land in a temporary file that is renamed over the target, and a
    /// reader never sees a partially written blob.
    #[derive(Debug, Clone)]
    pub struct FsTreeStore {
        root: PathBuf,
    }

    impl FsTreeStore {
        /// Use `root` as the blob directory. It is created on first write.
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        /// The blob directory.
        pub fn root(&self) -> &std::path::Path {
            &self.root
        }

        fn blob_path(&self, key: &str) -> PathBuf {
            self.root
                .join(format!("{}.{}", hex::encode(key.as_bytes()), BLOB_EXTENSION))
        }
    }

    #[async_trait]
    impl TreeStore for FsTreeStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            match tokio::fs::read(self.blob_path(key)).await {
                Ok(blob) => Ok(Some(blob)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StoreError::Io(e)),
            }
        }

        async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError> {
            tokio::fs::create_dir_all(&self.root).await?;
            let path = self.blob_path(key);
            let tmp = path.with_extension(format!("{}.tmp", BLOB_EXTENSION));
            tokio::fs::write(&tmp, &blob).await?;
            tokio::fs::rename(&tmp, &path).await?;
            debug!(path = %path.display(), bytes = blob.len(), "wrote tree blob");
            Ok(())
        }
    }
}
