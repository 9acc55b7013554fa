//! # State Tree
//!
//! Lazily built, index-addressable trees over the state of a captured
//! program after a given command.
//!
//! ## Features
//!
//! - **Lazy expansion**: a node builds its children on first access, exactly once
//! - **Subgrouping** of large collections into `[start - end]` ranges
//! - **Memory-backed collections** that are only read when expanded
//! - **Previews** of leaf values and small collections
//! - **Content-addressed trees**: equal requests share one tree
//!
//! ## Architecture
//!
//! ```text
//! StateAfter + group limit
//!     │
//!     ├──> StateTreeService::resolve_tree
//!     │      └─> Store (content key -> TreeId, single-flight build)
//!     │
//!     ├──> SnapshotProvider
//!     │      └─> Snapshot { root value, memory, layout }
//!     │
//!     └──> StateTree
//!            └─> Node ──> children (records, maps, sequences, memory slices)
//!                           └─> NodeDescriptor { name, preview, constants, ... }
//! ```
//!
//! ## Example
//!
//! ```
//! use stateview_tree::{
//!     ApiId, MemoryLayout, PoolMemory, Record, Snapshot, SnapshotProvider, StateAfter,
//!     StateTreeService, StaticConstants, TreeConfig,
//! };
//! use std::sync::Arc;
//!
//! struct Fixed;
//!
//! impl SnapshotProvider for Fixed {
//!     fn state_after(&self, _after: &StateAfter) -> stateview_tree::Result<Snapshot> {
//!         Ok(Snapshot {
//!             api: ApiId::new("gles"),
//!             root: Record::builder("State").field("values", &(0u32..25).collect::<Vec<_>>()).build(),
//!             layout: MemoryLayout::default(),
//!             memory: Arc::new(PoolMemory::new()),
//!         })
//!     }
//! }
//!
//! # fn main() -> stateview_tree::Result<()> {
//! let service = StateTreeService::new(
//!     Arc::new(Fixed),
//!     Arc::new(StaticConstants::new()),
//!     TreeConfig::default(),
//! )?;
//! let handle = service.resolve_tree(&StateAfter::new("cap", vec![3]), 10)?;
//! let values = service.node_at(&handle.node([0]))?;
//! assert_eq!(values.num_children, 3);
//! assert_eq!(service.node_at(&handle.node([0, 2]))?.name, "[20 - 24]");
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod constants;
pub mod error;
pub mod memory;
pub mod node;
pub mod preview;
pub mod resolve;
pub mod snapshot;
pub mod store;
pub mod subgroup;
pub mod tree;
pub mod value;

pub use capture::{CaptureDocument, CaptureFile};
pub use config::TreeConfig;
pub use constants::{ApiId, Constant, ConstantRegistry, ConstantSet, StaticConstants};
pub use error::{Result, TreeError};
pub use memory::{
    ElementType, Endian, MemoryLayout, MemoryPointer, MemoryReader, MemorySlice, PoolId,
    PoolMemory,
};
pub use node::{Node, NodeDescriptor};
pub use preview::preview;
pub use resolve::{StateTreeService, TreeHandle};
pub use snapshot::{Snapshot, SnapshotProvider};
pub use store::{MemoryStore, Resolvable, Store};
pub use subgroup::GroupLimit;
pub use tree::{NodePath, StateTree, TreeId};
pub use value::{Field, Inspect, Record, RecordBuilder, Seq, Shape, Value};

pub use stateview_path::{CaptureId, MapKey, Path, Segment, StateAfter};
