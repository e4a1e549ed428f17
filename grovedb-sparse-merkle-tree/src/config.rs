/// How the node cache is brought up to date after a leaf write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RebuildStrategy {
    /// Recompute every level from the populated leaves.
    #[default]
    Full,
    /// Recompute only the ancestor chain of the written leaf.
    Incremental,
}

/// What `open` does when a persisted tree has a different depth than asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DepthMismatchPolicy {
    /// Use the persisted depth and log a warning.
    #[default]
    PersistedWins,
    /// Fail with `SparseMerkleError::DepthMismatch`.
    Reject,
}

/// Options for opening a tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TreeConfig {
    /// Rebuild algorithm run by every update.
    pub rebuild_strategy: RebuildStrategy,
    /// Handling of a depth argument that disagrees with persisted state.
    pub depth_mismatch: DepthMismatchPolicy,
    /// Prefix prepended to the tree name to form its store key.
    pub key_prefix: Option<String>,
}

impl TreeConfig {
    /// Set the rebuild strategy.
    pub fn with_rebuild_strategy(mut self, strategy: RebuildStrategy) -> Self {
        self.rebuild_strategy = strategy;
        self
    }

    /// Set the depth mismatch policy.
    pub fn with_depth_mismatch(mut self, policy: DepthMismatchPolicy) -> Self {
        self.depth_mismatch = policy;
        self
    }

    /// Set the store key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Store key for the tree called `name`.
    pub fn storage_key(&self, name: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.rebuild_strategy, RebuildStrategy::Full);
        assert_eq!(config.depth_mismatch, DepthMismatchPolicy::PersistedWins);
        assert_eq!(config.storage_key("balances"), "balances");
    }

    #[test]
    fn test_key_prefix() {
        let config = TreeConfig::default().with_key_prefix("smt:");
        assert_eq!(config.storage_key("balances"), "smt:balances");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial_config() {
        let config: TreeConfig =
            serde_json::from_str(r#"{"rebuild_strategy":"incremental"}"#).expect("valid json");
        assert_eq!(config.rebuild_strategy, RebuildStrategy::Incremental);
        assert_eq!(config.depth_mismatch, DepthMismatchPolicy::PersistedWins);
        assert_eq!(config.key_prefix, None);
    }
}
