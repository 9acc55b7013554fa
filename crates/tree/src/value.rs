//! Closed value model for snapshot data.
//!
//! A snapshot is described as a [`Value`] instead of being inspected at run
//! time. Every variant shares its payload through `Arc`, so handing a child
//! value to a tree node is a reference-count bump and sequence sub-ranges are
//! views over the parent's storage.

use crate::memory::{MemoryPointer, MemorySlice};
use serde::{Deserialize, Serialize};
use stateview_path::MapKey;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

/// A value inside a state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(Arc<str>),
    /// Pointer into traced memory
    Pointer(MemoryPointer),
    /// Sequence whose elements still live in traced memory
    Slice(MemorySlice),
    /// Sequence already present in the snapshot
    Sequence(Seq),
    /// Keyed map, stored in arbitrary order
    Map(Arc<[(MapKey, Value)]>),
    Record(Arc<Record>),
    /// Optional or reference wrapper; `None` is an absent reference
    Ref(Option<Arc<Value>>),
}

/// Structural class of a value, as seen by child construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Record,
    OrderedSequence,
    KeyedMap,
    MemoryBackedSequence,
    Scalar,
    Indirection,
}

impl Value {
    pub const ABSENT: Value = Value::Ref(None);

    pub fn shape(&self) -> Shape {
        match self {
            Self::Record(_) => Shape::Record,
            Self::Sequence(_) => Shape::OrderedSequence,
            Self::Map(_) => Shape::KeyedMap,
            Self::Slice(_) => Shape::MemoryBackedSequence,
            Self::Ref(Some(_)) => Shape::Indirection,
            Self::Bool(_)
            | Self::Int(_)
            | Self::Uint(_)
            | Self::Float(_)
            | Self::Text(_)
            | Self::Pointer(_)
            | Self::Ref(None) => Shape::Scalar,
        }
    }

    /// Follow present references down to the referenced value.
    pub fn strip_refs(&self) -> &Value {
        let mut current = self;
        while let Self::Ref(Some(inner)) = current {
            current = inner;
        }
        current
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Ref(None))
    }

    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(Arc::from(value.as_ref()))
    }

    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    pub fn map(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Self::Map(entries.into_iter().collect())
    }

    pub fn reference(value: Value) -> Self {
        Self::Ref(Some(Arc::new(value)))
    }
}

/// Range view over shared sequence storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "Vec<Value>")]
pub struct Seq {
    items: Arc<[Value]>,
    range: Range<usize>,
}

impl Seq {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items[self.range.clone()]
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_slice().get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.as_slice().iter()
    }

    /// Elements `[start, end)` of this view, sharing storage.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Seq {
        let end = end.min(self.len());
        let start = start.min(end);
        Seq {
            items: Arc::clone(&self.items),
            range: self.range.start + start..self.range.start + end,
        }
    }

    /// True when both views read the same storage.
    pub fn shares_storage(&self, other: &Seq) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl PartialEq for Seq {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl From<Vec<Value>> for Seq {
    fn from(items: Vec<Value>) -> Self {
        let len = items.len();
        Self {
            items: Arc::from(items),
            range: 0..len,
        }
    }
}

impl From<Seq> for Vec<Value> {
    fn from(seq: Seq) -> Self {
        seq.as_slice().to_vec()
    }
}

impl FromIterator<Value> for Seq {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Record value: a named type with fields in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: Arc<str>,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn builder(type_name: impl AsRef<str>) -> RecordBuilder {
        RecordBuilder {
            record: Record {
                type_name: Arc::from(type_name.as_ref()),
                fields: Vec::new(),
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| &*f.name == name)
    }
}

/// Record field with its display annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Arc<str>,
    pub value: Value,

    /// Hidden fields never become tree children
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,

    /// Index of the constant set naming this field's values (0 or none = no set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant_set: Option<u32>,
}

/// Incremental construction of a [`Record`] value
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    fn push(mut self, name: &str, value: Value, hidden: bool, constant_set: Option<u32>) -> Self {
        self.record.fields.push(Field {
            name: Arc::from(name),
            value,
            hidden,
            constant_set,
        });
        self
    }

    #[must_use]
    pub fn field(self, name: &str, value: &(impl Inspect + ?Sized)) -> Self {
        self.push(name, value.inspect(), false, None)
    }

    /// Field whose values are named by constant set `index`.
    #[must_use]
    pub fn constant_field(self, name: &str, value: &(impl Inspect + ?Sized), index: u32) -> Self {
        self.push(name, value.inspect(), false, Some(index))
    }

    /// Field kept in the value but never shown as a child.
    #[must_use]
    pub fn hidden_field(self, name: &str, value: &(impl Inspect + ?Sized)) -> Self {
        self.push(name, value.inspect(), true, None)
    }

    pub fn build_record(self) -> Record {
        self.record
    }

    pub fn build(self) -> Value {
        Value::Record(Arc::new(self.record))
    }
}

/// Describes a type as a snapshot [`Value`]
pub trait Inspect {
    fn inspect(&self) -> Value;
}

impl Inspect for Value {
    fn inspect(&self) -> Value {
        self.clone()
    }
}

impl Inspect for bool {
    fn inspect(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! inspect_as {
    ($variant:ident, $wide:ty, $($ty:ty),+) => {
        $(impl Inspect for $ty {
            fn inspect(&self) -> Value {
                Value::$variant(<$wide>::from(*self))
            }
        })+
    };
}

inspect_as!(Int, i64, i8, i16, i32, i64);
inspect_as!(Uint, u64, u8, u16, u32, u64);
inspect_as!(Float, f64, f32, f64);

impl Inspect for usize {
    fn inspect(&self) -> Value {
        Value::Uint(u64::try_from(*self).unwrap_or(u64::MAX))
    }
}

impl Inspect for str {
    fn inspect(&self) -> Value {
        Value::text(self)
    }
}

impl Inspect for String {
    fn inspect(&self) -> Value {
        Value::text(self)
    }
}

impl Inspect for MemoryPointer {
    fn inspect(&self) -> Value {
        Value::Pointer(*self)
    }
}

impl Inspect for MemorySlice {
    fn inspect(&self) -> Value {
        Value::Slice(*self)
    }
}

impl Inspect for Record {
    fn inspect(&self) -> Value {
        Value::Record(Arc::new(self.clone()))
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn inspect(&self) -> Value {
        Value::Ref(self.as_ref().map(|v| Arc::new(v.inspect())))
    }
}

impl<T: Inspect + ?Sized> Inspect for &T {
    fn inspect(&self) -> Value {
        (**self).inspect()
    }
}

impl<T: Inspect + ?Sized> Inspect for Arc<T> {
    fn inspect(&self) -> Value {
        Value::reference(self.as_ref().inspect())
    }
}

impl<T: Inspect + ?Sized> Inspect for Box<T> {
    fn inspect(&self) -> Value {
        Value::reference(self.as_ref().inspect())
    }
}

impl<T: Inspect> Inspect for [T] {
    fn inspect(&self) -> Value {
        Value::sequence(self.iter().map(Inspect::inspect))
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn inspect(&self) -> Value {
        self.as_slice().inspect()
    }
}

impl<K, V> Inspect for BTreeMap<K, V>
where
    K: Clone + Into<MapKey>,
    V: Inspect,
{
    fn inspect(&self) -> Value {
        Value::map(self.iter().map(|(k, v)| (k.clone().into(), v.inspect())))
    }
}

impl<K, V, S> Inspect for HashMap<K, V, S>
where
    K: Clone + Into<MapKey>,
    V: Inspect,
{
    fn inspect(&self) -> Value {
        Value::map(self.iter().map(|(k, v)| (k.clone().into(), v.inspect())))
    }
}
