use crate::constants::ApiId;
use crate::error::Result;
use crate::memory::{MemoryLayout, MemoryReader};
use crate::value::Value;
use stateview_path::StateAfter;
use std::fmt;
use std::sync::Arc;

/// The state of one API after a command, plus access to traced memory
#[derive(Clone)]
pub struct Snapshot {
    pub api: ApiId,
    pub root: Value,
    pub layout: MemoryLayout,
    pub memory: Arc<dyn MemoryReader>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("api", &self.api)
            .field("root", &self.root.shape())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Produces the state snapshot after a command.
///
/// Implementations reject addresses that descend into sub-commands with
/// [`TreeError::Unsupported`](crate::TreeError::Unsupported).
pub trait SnapshotProvider: Send + Sync {
    fn state_after(&self, after: &StateAfter) -> Result<Snapshot>;
}
