//! Test utilities: a dense reference tree and misbehaving stores.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;

use crate::{Digest, LeafValue, MemTreeStore, MerkleHasher, StoreError, TreeStore, ZERO_LEAF};

/// Deterministic leaf value derived from a seed.
pub(crate) fn test_leaf(seed: u64) -> LeafValue {
    let mut value = [0u8; 64];
    for (i, chunk) in value.chunks_mut(8).enumerate() {
        chunk.copy_from_slice(&(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ i as u64).to_le_bytes());
    }
    value
}

/// Root of a fully materialised tree of `depth` with `leaves` written and
/// zero values elsewhere.
pub(crate) fn dense_root<H: MerkleHasher>(
    depth: u8,
    leaves: &[(u64, LeafValue)],
    hasher: &H,
) -> Digest {
    let width = 1usize << depth;
    let mut values = vec![ZERO_LEAF; width];
    for &(index, value) in leaves {
        values[index as usize] = value;
    }
    let mut level: Vec<Digest> = values.iter().map(|v| hasher.hash(v)).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hasher.compress(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Store that fails every read.
#[derive(Debug)]
pub(crate) struct BrokenReadStore;

#[async_trait]
impl TreeStore for BrokenReadStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Backend("read timed out".to_string()))
    }

    async fn put(&self, _key: &str, _blob: Vec<u8>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-memory store that starts failing writes after `allowed_puts` writes.
#[derive(Debug, Clone)]
pub(crate) struct FlakyWriteStore {
    pub inner: MemTreeStore,
    pub puts: Arc<AtomicUsize>,
    allowed_puts: Arc<AtomicUsize>,
}

impl FlakyWriteStore {
    pub fn new(allowed_puts: usize) -> Self {
        Self {
            inner: MemTreeStore::new(),
            puts: Arc::new(AtomicUsize::new(0)),
            allowed_puts: Arc::new(AtomicUsize::new(allowed_puts)),
        }
    }

    /// Let every later write through.
    pub fn heal(&self) {
        self.allowed_puts.store(usize::MAX, Ordering::SeqCst);
    }
}

#[async_trait]
impl TreeStore for FlakyWriteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        if self.puts.fetch_add(1, Ordering::SeqCst) >= self.allowed_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.put(key, blob).await
    }
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
