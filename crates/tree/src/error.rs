use crate::tree::{NodePath, TreeId};
use thiserror::Error;

/// Result type for state tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while resolving or walking a state tree.
///
/// Errors are `Clone` because a failed build is memoized on its node and a
/// failed store load is handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The request addresses something the tree cannot represent
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An index along a walk exceeded the child count of its node.
    /// `at` is the valid prefix of the walk (the node that was indexed).
    #[error("Index {index} out of bounds {} at {at}", bound_text(.count))]
    IndexOutOfBounds { index: u64, count: u64, at: NodePath },

    /// The handle does not name any registered tree
    #[error("Unknown state tree: {0}")]
    UnknownTree(TreeId),

    /// The store already holds its maximum number of trees
    #[error("State tree store is full ({0} trees)")]
    StoreFull(usize),

    /// The snapshot provider failed
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Loading an element out of traced memory failed
    #[error("Memory load error: {0}")]
    MemoryLoad(String),

    /// Constant set lookup failed
    #[error("Constant set error: {0}")]
    Constants(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn bound_text(count: &u64) -> String {
    match count {
        0 => "(node has no children)".to_string(),
        n => format!("[0, {}]", n - 1),
    }
}

impl TreeError {
    /// Create an unsupported-request error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a snapshot error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a memory load error
    pub fn memory_load(msg: impl Into<String>) -> Self {
        Self::MemoryLoad(msg.into())
    }

    /// Create a constant set error
    pub fn constants(msg: impl Into<String>) -> Self {
        Self::Constants(msg.into())
    }

    /// Inclusive range of indices that would have been valid, if any.
    pub fn valid_bound(&self) -> Option<(u64, u64)> {
        match self {
            Self::IndexOutOfBounds { count, .. } if *count > 0 => Some((0, count - 1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_message_names_bound_and_prefix() {
        let err = TreeError::IndexOutOfBounds {
            index: 5,
            count: 3,
            at: NodePath::new(TreeId::fingerprint("t"), vec![]),
        };
        assert_eq!(err.to_string(), "Index 5 out of bounds [0, 2] at root");
        assert_eq!(err.valid_bound(), Some((0, 2)));
    }

    #[test]
    fn out_of_bounds_on_leaf_has_no_bound() {
        let err = TreeError::IndexOutOfBounds {
            index: 0,
            count: 0,
            at: NodePath::new(TreeId::fingerprint("t"), vec![1, 4]),
        };
        assert_eq!(
            err.to_string(),
            "Index 0 out of bounds (node has no children) at root/1/4"
        );
        assert_eq!(err.valid_bound(), None);
    }
}
