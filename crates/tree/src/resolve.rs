use crate::config::TreeConfig;
use crate::constants::ConstantRegistry;
use crate::error::{Result, TreeError};
use crate::node::NodeDescriptor;
use crate::snapshot::SnapshotProvider;
use crate::store::{MemoryStore, Resolvable, Store};
use crate::subgroup::GroupLimit;
use crate::tree::{NodePath, StateTree, TreeId};
use serde::{Deserialize, Serialize};
use stateview_path::{Path, StateAfter};
use std::ops::Range;
use std::sync::Arc;

/// Handle to a resolved state tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeHandle {
    pub root: NodePath,
}

impl TreeHandle {
    pub fn id(&self) -> &TreeId {
        &self.root.tree
    }

    /// Path of the node at `indices` below the root.
    pub fn node(&self, indices: impl Into<Vec<u64>>) -> NodePath {
        NodePath::new(self.root.tree.clone(), indices.into())
    }
}

/// Work item building the tree for the state after one command
struct TreeResolvable {
    after: StateAfter,
    group_limit: GroupLimit,
    snapshots: Arc<dyn SnapshotProvider>,
    constants: Arc<dyn ConstantRegistry>,
}

impl Resolvable for TreeResolvable {
    fn key(&self) -> String {
        format!("state_tree|{}|{}", self.after, self.group_limit.get())
    }

    fn resolve(&self, id: &TreeId) -> Result<StateTree> {
        let snapshot = self.snapshots.state_after(&self.after)?;
        log::info!(
            "Building state tree {} for {} (api {}, group limit {})",
            id.short(),
            self.after,
            snapshot.api,
            self.group_limit.get()
        );
        Ok(StateTree::new(
            id.clone(),
            snapshot,
            Path::state_after(self.after.clone()),
            self.constants.clone(),
            self.group_limit,
        ))
    }
}

fn check_supported(after: &StateAfter) -> Result<()> {
    if after.command.is_empty() {
        return Err(TreeError::unsupported(format!(
            "{after} does not name a command"
        )));
    }
    if after.is_nested() {
        return Err(TreeError::unsupported(format!(
            "{after} addresses a sub-command; state trees of sub-commands are not supported"
        )));
    }
    Ok(())
}

/// Caller-facing entry point: resolves tree handles and walks them
pub struct StateTreeService {
    store: Arc<dyn Store>,
    snapshots: Arc<dyn SnapshotProvider>,
    constants: Arc<dyn ConstantRegistry>,
    config: TreeConfig,
}

impl StateTreeService {
    /// Service backed by an in-process [`MemoryStore`].
    pub fn new(
        snapshots: Arc<dyn SnapshotProvider>,
        constants: Arc<dyn ConstantRegistry>,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(MemoryStore::new(config.store_capacity));
        Ok(Self::with_store(store, snapshots, constants, config))
    }

    pub fn with_store(
        store: Arc<dyn Store>,
        snapshots: Arc<dyn SnapshotProvider>,
        constants: Arc<dyn ConstantRegistry>,
        config: TreeConfig,
    ) -> Self {
        Self {
            store,
            snapshots,
            constants,
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Register the tree for the state after `after`, grouped by `group_limit`.
    ///
    /// Nothing is built here; equal requests get equal handles and share one
    /// tree. Sub-command addresses are rejected immediately.
    pub fn resolve_tree(&self, after: &StateAfter, group_limit: u64) -> Result<TreeHandle> {
        check_supported(after)?;
        let work = Arc::new(TreeResolvable {
            after: after.clone(),
            group_limit: GroupLimit::new(group_limit),
            snapshots: self.snapshots.clone(),
            constants: self.constants.clone(),
        });
        let id = self.store.store(work)?;
        log::debug!("Registered state tree {} for {after}", id.short());
        Ok(TreeHandle {
            root: NodePath::root(id),
        })
    }

    /// [`resolve_tree`](Self::resolve_tree) with the configured default limit.
    pub fn resolve_default_tree(&self, after: &StateAfter) -> Result<TreeHandle> {
        self.resolve_tree(after, self.config.default_group_limit)
    }

    /// The built tree behind `id`.
    pub fn tree(&self, id: &TreeId) -> Result<Arc<StateTree>> {
        self.store.resolve(id)
    }

    /// Descriptor of the node at `path`.
    pub fn node_at(&self, path: &NodePath) -> Result<NodeDescriptor> {
        let tree = self.tree(&path.tree)?;
        tree.node_at(&path.indices)
    }

    /// Descriptors of the children of the node at `path` whose indices fall
    /// in `range`. The range is clipped to the available children.
    pub fn children_at(&self, path: &NodePath, range: Range<u64>) -> Result<Vec<NodeDescriptor>> {
        let tree = self.tree(&path.tree)?;
        let children = tree.children(&path.indices)?;
        let len = children.len();
        let clip = |v: u64| usize::try_from(v).map_or(len, |v| v.min(len));
        let (start, end) = (clip(range.start), clip(range.end));
        children[start..end.max(start)]
            .iter()
            .map(|child| tree.describe(child))
            .collect()
    }
}
