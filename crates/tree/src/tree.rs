use crate::constants::{ApiId, ConstantRegistry};
use crate::error::{Result, TreeError};
use crate::node::{BuildContext, Node, NodeDescriptor};
use crate::snapshot::Snapshot;
use crate::subgroup::GroupLimit;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stateview_path::Path;
use std::fmt;
use std::sync::Arc;

/// Content-derived identifier of a state tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    /// SHA-256 of the canonical request key, as lowercase hex.
    pub fn fingerprint(key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TreeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A node of a tree, addressed by child indices from the root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    pub tree: TreeId,
    #[serde(default)]
    pub indices: Vec<u64>,
}

impl NodePath {
    pub fn new(tree: TreeId, indices: Vec<u64>) -> Self {
        Self { tree, indices }
    }

    pub fn root(tree: TreeId) -> Self {
        Self::new(tree, Vec::new())
    }

    #[must_use]
    pub fn child(&self, index: u64) -> Self {
        let mut indices = self.indices.clone();
        indices.push(index);
        Self::new(self.tree.clone(), indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for idx in &self.indices {
            write!(f, "/{idx}")?;
        }
        Ok(())
    }
}

/// Lazily built tree over one snapshot.
///
/// Only nodes change after construction, and only by building their
/// children once.
pub struct StateTree {
    id: TreeId,
    root: Node,
    ctx: BuildContext,
}

impl StateTree {
    pub fn new(
        id: TreeId,
        snapshot: Snapshot,
        root_path: Path,
        constants: Arc<dyn ConstantRegistry>,
        group_limit: GroupLimit,
    ) -> Self {
        let root = Node::new("root", &snapshot.root, root_path);
        Self {
            id,
            root,
            ctx: BuildContext {
                api: snapshot.api,
                layout: snapshot.layout,
                memory: snapshot.memory,
                constants,
                group_limit,
            },
        }
    }

    pub fn id(&self) -> &TreeId {
        &self.id
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn api(&self) -> &ApiId {
        &self.ctx.api
    }

    pub fn group_limit(&self) -> GroupLimit {
        self.ctx.group_limit
    }

    pub(crate) fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Walk `indices` from the root, building children along the way.
    ///
    /// The first index past its node's child count fails with
    /// [`TreeError::IndexOutOfBounds`] naming the indexed node; any build
    /// failure aborts the walk unchanged.
    pub fn node(&self, indices: &[u64]) -> Result<&Node> {
        let mut node = &self.root;
        for (depth, &index) in indices.iter().enumerate() {
            let children = node.children(self)?;
            node = usize::try_from(index)
                .ok()
                .and_then(|i| children.get(i))
                .ok_or_else(|| TreeError::IndexOutOfBounds {
                    index,
                    count: u64::try_from(children.len()).unwrap_or(u64::MAX),
                    at: NodePath::new(self.id.clone(), indices[..depth].to_vec()),
                })?;
        }
        Ok(node)
    }

    /// Descriptor of the node at `indices`.
    pub fn node_at(&self, indices: &[u64]) -> Result<NodeDescriptor> {
        self.node(indices)?.describe(self)
    }

    /// Children of the node at `indices`, built with this tree's layout,
    /// memory and group limit.
    pub fn children(&self, indices: &[u64]) -> Result<&[Node]> {
        self.node(indices)?.children(self)
    }

    /// Descriptor of a node of this tree, as returned by [`node`](Self::node)
    /// or [`children`](Self::children).
    pub fn describe(&self, node: &Node) -> Result<NodeDescriptor> {
        node.describe(self)
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("id", &self.id)
            .field("api", &self.ctx.api)
            .field("group_limit", &self.ctx.group_limit)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
