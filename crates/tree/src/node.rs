use crate::constants::{ApiId, ConstantRegistry, ConstantSet};
use crate::error::Result;
use crate::memory::{MemoryLayout, MemoryReader, MemorySlice};
use crate::preview::preview;
use crate::subgroup::{needs_subgrouping, subgroup_name, subgroups, GroupLimit};
use crate::tree::StateTree;
use crate::value::{Record, Seq, Value};
use serde::Serialize;
use stateview_path::{MapKey, Path};
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

/// Everything a node needs from its tree to build children
pub(crate) struct BuildContext {
    pub(crate) api: ApiId,
    pub(crate) layout: MemoryLayout,
    pub(crate) memory: Arc<dyn MemoryReader>,
    pub(crate) constants: Arc<dyn ConstantRegistry>,
    pub(crate) group_limit: GroupLimit,
}

/// A position in a state tree.
///
/// Children are built on first access, exactly once. Concurrent callers
/// block on the same initializer and then all observe the same sequence.
/// A failed build is kept and reported again on every later access.
pub struct Node {
    name: String,
    value: Value,
    path: Path,
    constants: Option<Arc<ConstantSet>>,
    subgroup_offset: u64,
    children: OnceLock<Result<Vec<Node>>>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, value: &Value, path: Path) -> Self {
        Self {
            name: name.into(),
            value: value.strip_refs().clone(),
            path,
            constants: None,
            subgroup_offset: 0,
            children: OnceLock::new(),
        }
    }

    fn with_constants(mut self, constants: Option<Arc<ConstantSet>>) -> Self {
        self.constants = constants;
        self
    }

    fn with_offset(mut self, offset: u64) -> Self {
        self.subgroup_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn constants(&self) -> Option<&Arc<ConstantSet>> {
        self.constants.as_ref()
    }

    /// Absolute index of this node's first element in the grouped collection.
    pub fn subgroup_offset(&self) -> u64 {
        self.subgroup_offset
    }

    pub fn is_built(&self) -> bool {
        self.children.get().is_some()
    }

    /// Children of this node, building them on first use.
    ///
    /// `tree` must be the tree that owns this node.
    pub(crate) fn children(&self, tree: &StateTree) -> Result<&[Node]> {
        match self.children.get_or_init(|| self.build_children(tree.context())) {
            Ok(children) => Ok(children.as_slice()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Externally visible summary of this node.
    pub(crate) fn describe(&self, tree: &StateTree) -> Result<NodeDescriptor> {
        let num_children = u64::try_from(self.children(tree)?.len()).unwrap_or(u64::MAX);
        let (preview, preview_is_value) = preview(&self.value);
        Ok(NodeDescriptor {
            name: self.name.clone(),
            num_children,
            value_path: self.path.clone(),
            preview,
            preview_is_value,
            constants: self.constants.clone(),
        })
    }

    fn build_children(&self, ctx: &BuildContext) -> Result<Vec<Node>> {
        let children = match &self.value {
            Value::Slice(slice) => self.memory_children(slice, ctx),
            Value::Sequence(seq) => Ok(self.sequence_children(seq, ctx.group_limit)),
            Value::Map(entries) => Ok(self.map_children(entries)),
            Value::Record(record) => self.record_children(record, ctx),
            _ => Ok(Vec::new()),
        };
        match &children {
            Ok(children) => log::debug!(
                "Built {} children for '{}' at {}",
                children.len(),
                self.name,
                self.path
            ),
            Err(err) => log::debug!("Failed to build '{}' at {}: {err}", self.name, self.path),
        }
        children
    }

    fn subgroup_children(
        &self,
        limit: GroupLimit,
        count: u64,
        mut slice: impl FnMut(&Range<u64>) -> Value,
    ) -> Vec<Node> {
        subgroups(limit, count)
            .map(|range| {
                Node::new(
                    subgroup_name(self.subgroup_offset, &range),
                    &slice(&range),
                    self.path.clone(),
                )
                .with_offset(self.subgroup_offset + range.start)
            })
            .collect()
    }

    fn element_child(&self, local: u64, value: &Value) -> Node {
        let index = self.subgroup_offset + local;
        Node::new(index.to_string(), value, self.path.index(index))
    }

    fn memory_children(&self, slice: &MemorySlice, ctx: &BuildContext) -> Result<Vec<Node>> {
        if needs_subgrouping(ctx.group_limit, slice.count) {
            return Ok(self.subgroup_children(ctx.group_limit, slice.count, |range| {
                Value::Slice(slice.slice(range.start, range.end, &ctx.layout))
            }));
        }
        (0..slice.count)
            .map(|i| {
                let pointer = slice.index(i, &ctx.layout);
                let element = ctx.memory.load(&pointer, &ctx.layout)?;
                Ok(self.element_child(i, &element))
            })
            .collect()
    }

    fn sequence_children(&self, seq: &Seq, limit: GroupLimit) -> Vec<Node> {
        let count = seq.len() as u64;
        if needs_subgrouping(limit, count) {
            return self.subgroup_children(limit, count, |range| {
                Value::Sequence(seq.slice(range.start as usize, range.end as usize))
            });
        }
        seq.iter()
            .zip(0u64..)
            .map(|(element, i)| self.element_child(i, element))
            .collect()
    }

    fn map_children(&self, entries: &[(MapKey, Value)]) -> Vec<Node> {
        let mut sorted: Vec<&(MapKey, Value)> = entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted
            .into_iter()
            .map(|(key, value)| Node::new(key.to_string(), value, self.path.key(key.clone())))
            .collect()
    }

    fn record_children(&self, record: &Record, ctx: &BuildContext) -> Result<Vec<Node>> {
        record
            .fields
            .iter()
            .filter(|field| !field.hidden)
            .map(|field| {
                let constants = match field.constant_set {
                    Some(index) if index > 0 => {
                        Some(ctx.constants.constant_set(&ctx.api, index)?)
                    }
                    _ => None,
                };
                Ok(
                    Node::new(&*field.name, &field.value, self.path.field(&field.name))
                        .with_constants(constants),
                )
            })
            .collect()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("subgroup_offset", &self.subgroup_offset)
            .field("built", &self.is_built())
            .finish_non_exhaustive()
    }
}

/// The externally observable shape of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub num_children: u64,
    pub value_path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Value>,
    pub preview_is_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constants: Option<Arc<ConstantSet>>,
}
