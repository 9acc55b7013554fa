use crate::error::{Result, TreeError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a memory pool in the traced process
pub type PoolId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// How the traced process laid out its memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryLayout {
    pub pointer_size: u32,
    #[serde(default)]
    pub endian: Endian,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            pointer_size: 8,
            endian: Endian::Little,
        }
    }
}

/// Element type of a pointer or memory-backed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Bool,
    Pointer,
}

impl ElementType {
    /// Size in bytes of one element under `layout`.
    pub fn size(self, layout: &MemoryLayout) -> u64 {
        match self {
            Self::U8 | Self::I8 | Self::Bool => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
            Self::Pointer => u64::from(layout.pointer_size),
        }
    }
}

/// Typed pointer into traced memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryPointer {
    pub pool: PoolId,
    pub address: u64,
    pub element: ElementType,
}

/// Contiguous run of `count` elements living in traced memory.
///
/// Nothing is read until an element is loaded through a [`MemoryReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemorySlice {
    pub pool: PoolId,
    pub base: u64,
    pub count: u64,
    pub element: ElementType,
}

impl MemorySlice {
    /// Pointer to the `i`th element.
    pub fn index(&self, i: u64, layout: &MemoryLayout) -> MemoryPointer {
        MemoryPointer {
            pool: self.pool,
            address: self
                .base
                .wrapping_add(i.wrapping_mul(self.element.size(layout))),
            element: self.element,
        }
    }

    /// Elements `[start, end)` of this slice.
    pub fn slice(&self, start: u64, end: u64, layout: &MemoryLayout) -> MemorySlice {
        let end = end.min(self.count);
        let start = start.min(end);
        MemorySlice {
            pool: self.pool,
            base: self.index(start, layout).address,
            count: end - start,
            element: self.element,
        }
    }
}

/// Reads single elements out of traced memory
pub trait MemoryReader: Send + Sync {
    fn load(&self, pointer: &MemoryPointer, layout: &MemoryLayout) -> Result<Value>;
}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
}

impl Region {
    fn read(&self, address: u64, len: u64) -> Option<&[u8]> {
        let offset = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let len = usize::try_from(len).ok()?;
        self.bytes.get(offset..offset.checked_add(len)?)
    }
}

/// Memory reader backed by byte regions kept in process, one list per pool
#[derive(Debug, Clone, Default)]
pub struct PoolMemory {
    pools: HashMap<PoolId, Vec<Region>>,
}

impl PoolMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` as the content of `pool` starting at `base`.
    pub fn write(&mut self, pool: PoolId, base: u64, bytes: Vec<u8>) {
        self.pools
            .entry(pool)
            .or_default()
            .push(Region { base, bytes });
    }

    fn read(&self, pool: PoolId, address: u64, len: u64) -> Option<&[u8]> {
        // Later writes shadow earlier ones.
        self.pools
            .get(&pool)?
            .iter()
            .rev()
            .find_map(|region| region.read(address, len))
    }
}

impl MemoryReader for PoolMemory {
    fn load(&self, pointer: &MemoryPointer, layout: &MemoryLayout) -> Result<Value> {
        let size = pointer.element.size(layout);
        let bytes = self
            .read(pointer.pool, pointer.address, size)
            .ok_or_else(|| {
                TreeError::memory_load(format!(
                    "{size} bytes at 0x{:x} in pool {} are not observed",
                    pointer.address, pointer.pool
                ))
            })?;
        decode(bytes, pointer, layout)
    }
}

fn decode(bytes: &[u8], pointer: &MemoryPointer, layout: &MemoryLayout) -> Result<Value> {
    if bytes.len() > 8 {
        return Err(TreeError::memory_load(format!(
            "element of {} bytes at 0x{:x} is wider than 64 bits",
            bytes.len(),
            pointer.address
        )));
    }
    let raw = read_uint(bytes, layout.endian);
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let value = match pointer.element {
        ElementType::U8 | ElementType::U16 | ElementType::U32 | ElementType::U64 => {
            Value::Uint(raw)
        }
        ElementType::I8 => Value::Int(i64::from(raw as u8 as i8)),
        ElementType::I16 => Value::Int(i64::from(raw as u16 as i16)),
        ElementType::I32 => Value::Int(i64::from(raw as u32 as i32)),
        ElementType::I64 => Value::Int(raw as i64),
        ElementType::F32 => Value::Float(f64::from(f32::from_bits(raw as u32))),
        ElementType::F64 => Value::Float(f64::from_bits(raw)),
        ElementType::Bool => Value::Bool(raw != 0),
        ElementType::Pointer => Value::Pointer(MemoryPointer {
            pool: pointer.pool,
            address: raw,
            element: ElementType::U8,
        }),
    };
    Ok(value)
}

fn read_uint(bytes: &[u8], endian: Endian) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match endian {
        Endian::Big => bytes.iter().take(8).fold(0, fold),
        Endian::Little => bytes.iter().take(8).rev().fold(0, fold),
    }
}
