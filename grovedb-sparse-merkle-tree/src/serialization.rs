//! Node cache persistence codec.
//!
//! The whole cache is encoded as one bincode blob: a sequence of levels
//! `0..=depth`, each an index-ordered map of `index -> digest`. Depth is not
//! stored; it is the number of levels minus one. Leaf values are never part
//! of the blob.
//!
//! Decoding validates the structure before handing the cache back:
//!
//! - level count gives a depth in `[1, 32]`,
//! - every index fits its level,
//! - every non-leaf node has at least one cached child and every non-root
//!   node has a cached parent.
//!
//! Digests themselves are not re-verified.

use crate::{
    cache::NodeCache,
    hash::{capacity_for_depth, validate_depth},
    SparseMerkleError,
};

/// Upper bound on a decoded blob.
const MAX_BLOB_SIZE: usize = 512 * 1024 * 1024;

/// Encode the full node cache.
pub fn encode_node_cache(cache: &NodeCache) -> Result<Vec<u8>, SparseMerkleError> {
    let config = bincode::config::standard()
        .with_big_endian()
        .with_no_limit();
    bincode::encode_to_vec(cache, config)
        .map_err(|e| SparseMerkleError::CorruptedData(format!("encode error: {}", e)))
}

/// Decode and validate a node cache produced by [`encode_node_cache`].
pub fn decode_node_cache(bytes: &[u8]) -> Result<NodeCache, SparseMerkleError> {
    let config = bincode::config::standard()
        .with_big_endian()
        .with_limit::<MAX_BLOB_SIZE>();
    let (cache, read): (NodeCache, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| SparseMerkleError::CorruptedData(format!("decode error: {}", e)))?;
    if read != bytes.len() {
        return Err(SparseMerkleError::CorruptedData(format!(
            "{} trailing bytes after node cache",
            bytes.len() - read
        )));
    }
    validate_structure(&cache)?;
    Ok(cache)
}

fn validate_structure(cache: &NodeCache) -> Result<(), SparseMerkleError> {
    let levels = cache.levels();
    if levels.len() < 2 {
        return Err(SparseMerkleError::CorruptedData(format!(
            "node cache has {} levels, need at least 2",
            levels.len()
        )));
    }
    let depth = u8::try_from(levels.len() - 1).map_err(|_| {
        SparseMerkleError::CorruptedData(format!("node cache has {} levels", levels.len()))
    })?;
    validate_depth(depth)
        .map_err(|_| SparseMerkleError::CorruptedData(format!("invalid depth {}", depth)))?;

    for (level, nodes) in levels.iter().enumerate() {
        let width = capacity_for_depth(depth - level as u8);
        if let Some((&last, _)) = nodes.last_key_value() {
            if last >= width {
                return Err(SparseMerkleError::CorruptedData(format!(
                    "index {} out of range at level {} (width {})",
                    last, level, width
                )));
            }
        }
        if level > 0 {
            let children = &levels[level - 1];
            let has_child = |index: u64| {
                children.contains_key(&(index << 1)) || children.contains_key(&((index << 1) | 1))
            };
            if let Some(&orphan) = nodes.keys().find(|&&index| !has_child(index)) {
                return Err(SparseMerkleError::CorruptedData(format!(
                    "node {} at level {} has no cached children",
                    orphan, level
                )));
            }
        }
        if level < depth as usize {
            let parents = &levels[level + 1];
            if let Some(&dangling) = nodes
                .keys()
                .find(|&&index| !parents.contains_key(&(index >> 1)))
            {
                return Err(SparseMerkleError::CorruptedData(format!(
                    "node {} at level {} has no cached parent",
                    dangling, level
                )));
            }
        }
    }
    Ok(())
}
