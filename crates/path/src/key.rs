use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Key of a keyed-map entry.
///
/// The derived ordering is total: keys compare by variant first
/// (`Bool < Int < Uint < Text`) and then by value, so maps with mixed key
/// kinds still sort the same way every time. Serialized externally tagged
/// (`{"uint": 5}`) so the kind survives a round-trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(Arc<str>),
}

impl MapKey {
    fn write_segment(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "[{text:?}]"),
            other => write!(f, "[{other}]"),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<bool> for MapKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MapKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for MapKey {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<u32> for MapKey {
    fn from(value: u32) -> Self {
        Self::Uint(u64::from(value))
    }
}

pub(crate) struct KeySegment<'a>(pub(crate) &'a MapKey);

impl fmt::Display for KeySegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_segment(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_keys_sort_by_kind_then_value() {
        let mut keys = vec![
            MapKey::from("b"),
            MapKey::from(7u64),
            MapKey::from(-1i64),
            MapKey::from(true),
            MapKey::from("a"),
            MapKey::from(3i64),
            MapKey::from(false),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                MapKey::from(false),
                MapKey::from(true),
                MapKey::from(-1i64),
                MapKey::from(3i64),
                MapKey::from(7u64),
                MapKey::from("a"),
                MapKey::from("b"),
            ]
        );
    }

    #[test]
    fn serialized_keys_keep_their_kind() {
        let keys = vec![
            MapKey::from(5u64),
            MapKey::from(5i64),
            MapKey::from(true),
            MapKey::from("5"),
        ];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"[{"uint":5},{"int":5},{"bool":true},{"text":"5"}]"#);

        let back: Vec<MapKey> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
        assert_eq!(back[0], MapKey::Uint(5));
    }

    #[test]
    fn text_segments_are_quoted() {
        assert_eq!(KeySegment(&MapKey::from("x y")).to_string(), r#"["x y"]"#);
        assert_eq!(KeySegment(&MapKey::from(5u32)).to_string(), "[5]");
        assert_eq!(MapKey::from("x y").to_string(), "x y");
    }
}
