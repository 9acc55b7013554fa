use crate::error::{Result, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of the graphics API whose state a tree shows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiId(Arc<str>);

impl ApiId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named constant inside a [`ConstantSet`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: u64,
}

/// Enumeration used to label the values of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantSet {
    pub name: String,
    #[serde(default)]
    pub is_bitfield: bool,
    pub constants: Vec<Constant>,
}

impl ConstantSet {
    /// Name of the constant with exactly `value`.
    pub fn name_of(&self, value: u64) -> Option<&str> {
        self.constants
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.name.as_str())
    }
}

/// Looks up constant sets by API and index
pub trait ConstantRegistry: Send + Sync {
    fn constant_set(&self, api: &ApiId, index: u32) -> Result<Arc<ConstantSet>>;
}

/// Registry holding its constant sets in memory
#[derive(Debug, Clone, Default)]
pub struct StaticConstants {
    sets: HashMap<(ApiId, u32), Arc<ConstantSet>>,
}

impl StaticConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, api: ApiId, index: u32, set: ConstantSet) {
        self.sets.insert((api, index), Arc::new(set));
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl ConstantRegistry for StaticConstants {
    fn constant_set(&self, api: &ApiId, index: u32) -> Result<Arc<ConstantSet>> {
        self.sets
            .get(&(api.clone(), index))
            .cloned()
            .ok_or_else(|| TreeError::constants(format!("API {api} has no constant set {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_set() -> ConstantSet {
        ConstantSet {
            name: "BufferUsage".to_string(),
            is_bitfield: false,
            constants: vec![
                Constant {
                    name: "STATIC_DRAW".to_string(),
                    value: 0x88e4,
                },
                Constant {
                    name: "DYNAMIC_DRAW".to_string(),
                    value: 0x88e8,
                },
            ],
        }
    }

    #[test]
    fn lookup_is_keyed_by_api_and_index() {
        let gles = ApiId::new("gles");
        let mut registry = StaticConstants::new();
        registry.insert(gles.clone(), 4, usage_set());

        let set = registry.constant_set(&gles, 4).expect("set");
        assert_eq!(set.name_of(0x88e8), Some("DYNAMIC_DRAW"));
        assert_eq!(set.name_of(1), None);

        assert!(registry.constant_set(&gles, 5).is_err());
        assert!(matches!(
            registry.constant_set(&ApiId::new("vulkan"), 4),
            Err(TreeError::Constants(_))
        ));
    }
}
