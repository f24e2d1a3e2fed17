use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a [`TreeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tree configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("max_nodes must be at least 1")]
    ZeroNodeBudget,
}

/// Tunables shared by the substrate and the AVL layer.
///
/// `max_nodes` is the node budget: once a tree holds that many nodes, further
/// allocations are refused with an `AllocationFailure` instead of growing.
/// `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_nodes: Option<usize>,
}

impl TreeConfig {
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: TreeConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == Some(0) {
            return Err(ConfigError::ZeroNodeBudget);
        }
        Ok(())
    }

    /// Returns the budget when a tree holding `size` nodes may not allocate
    /// `extra` more.
    pub(crate) fn exceeded_by(&self, size: usize, extra: usize) -> Option<usize> {
        let limit = self.max_nodes?;
        match size.checked_add(extra) {
            Some(total) if total <= limit => None,
            _ => Some(limit),
        }
    }
}
