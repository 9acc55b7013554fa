use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};

const DEFAULT_GROUP_LIMIT: u64 = 100;
const DEFAULT_STORE_CAPACITY: usize = 16;
const MAX_STORE_CAPACITY: usize = 1024;

/// Environment override for [`TreeConfig::default_group_limit`]
pub const GROUP_LIMIT_ENV: &str = "STATEVIEW_GROUP_LIMIT";
/// Environment override for [`TreeConfig::store_capacity`]
pub const STORE_CAPACITY_ENV: &str = "STATEVIEW_TREE_CACHE_CAPACITY";

/// Configuration for tree resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Group limit used when a caller does not pick one (0 disables grouping)
    pub default_group_limit: u64,

    /// Maximum number of distinct trees the in-process store registers
    pub store_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_group_limit: DEFAULT_GROUP_LIMIT,
            store_capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

impl TreeConfig {
    /// Defaults overridden by `STATEVIEW_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_group_limit: parse_group_limit(
                std::env::var(GROUP_LIMIT_ENV).ok().as_deref(),
                defaults.default_group_limit,
            ),
            store_capacity: parse_store_capacity(
                std::env::var(STORE_CAPACITY_ENV).ok().as_deref(),
                defaults.store_capacity,
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store_capacity == 0 {
            return Err(TreeError::invalid_config("store_capacity must be > 0"));
        }
        if self.store_capacity > MAX_STORE_CAPACITY {
            return Err(TreeError::invalid_config(format!(
                "store_capacity ({}) cannot exceed {MAX_STORE_CAPACITY}",
                self.store_capacity
            )));
        }
        Ok(())
    }
}

fn parse_group_limit(raw: Option<&str>, default_value: u64) -> u64 {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn parse_store_capacity(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_STORE_CAPACITY)
}
