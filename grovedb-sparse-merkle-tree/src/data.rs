use std::collections::HashMap;

use crate::hash::{LeafValue, ZERO_LEAF};

/// Sparse leaf values written during the lifetime of a tree instance.
///
/// An absent index holds the 64-zero-byte value. Values are never persisted;
/// only their digests reach the node cache.
#[derive(Debug, Clone, Default)]
pub struct DataBlockStore {
    values: HashMap<u64, LeafValue>,
}

impl DataBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value at `index`.
    pub fn set(&mut self, index: u64, value: LeafValue) {
        self.values.insert(index, value);
    }

    /// The value written at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&LeafValue> {
        self.values.get(&index)
    }

    /// The logical value at `index`: the written value or the zero leaf.
    pub fn get_or_zero(&self, index: u64) -> &LeafValue {
        self.values.get(&index).unwrap_or(&ZERO_LEAF)
    }

    /// Number of written indices.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Written `(index, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &LeafValue)> {
        self.values.iter().map(|(index, value)| (*index, value))
    }
}
