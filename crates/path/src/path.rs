use crate::command::StateAfter;
use crate::key::{KeySegment, MapKey};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// One link of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Root: the whole state after a command
    StateAfter(StateAfter),
    /// Named field of a record
    Field(Arc<str>),
    /// Element of an ordered sequence
    ArrayIndex(u64),
    /// Entry of a keyed map
    MapKey(MapKey),
}

struct Link {
    segment: Segment,
    parent: Option<Path>,
}

/// Immutable, tail-shared address of a value inside a snapshot.
///
/// Cloning is a reference-count bump. Extending a path allocates a single
/// link that refers to the parent, so a chain can never become cyclic.
#[derive(Clone)]
pub struct Path(Arc<Link>);

impl Path {
    /// Root path addressing the whole state after a command.
    pub fn state_after(after: StateAfter) -> Self {
        Self(Arc::new(Link {
            segment: Segment::StateAfter(after),
            parent: None,
        }))
    }

    fn extend(&self, segment: Segment) -> Self {
        Self(Arc::new(Link {
            segment,
            parent: Some(self.clone()),
        }))
    }

    #[must_use]
    pub fn field(&self, name: impl AsRef<str>) -> Self {
        self.extend(Segment::Field(Arc::from(name.as_ref())))
    }

    #[must_use]
    pub fn index(&self, index: u64) -> Self {
        self.extend(Segment::ArrayIndex(index))
    }

    #[must_use]
    pub fn key(&self, key: MapKey) -> Self {
        self.extend(Segment::MapKey(key))
    }

    /// Last segment of the chain.
    pub fn segment(&self) -> &Segment {
        &self.0.segment
    }

    pub fn parent(&self) -> Option<&Path> {
        self.0.parent.as_ref()
    }

    /// The command the chain is rooted at.
    pub fn root(&self) -> &StateAfter {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        match current.segment() {
            Segment::StateAfter(after) => after,
            // Only `state_after` creates parentless links.
            _ => unreachable!("path chain without a state_after root"),
        }
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Segments from the root down to this path's last segment.
    pub fn segments(&self) -> Segments<'_> {
        let mut stack = Vec::with_capacity(self.depth() + 1);
        let mut current = Some(self);
        while let Some(path) = current {
            stack.push(path.segment());
            current = path.parent();
        }
        Segments { stack }
    }

    /// True when both handles share the same link.
    pub fn ptr_eq(&self, other: &Path) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Root-to-leaf iterator over the segments of a [`Path`]
pub struct Segments<'a> {
    stack: Vec<&'a Segment>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.stack.len(), Some(self.stack.len()))
    }
}

impl ExactSizeIterator for Segments<'_> {}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        let mut a = Some(self);
        let mut b = Some(other);
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if x.ptr_eq(y) {
                        return true;
                    }
                    if x.segment() != y.segment() {
                        return false;
                    }
                    a = x.parent();
                    b = y.parent();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Path {}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.segments() {
            match segment {
                Segment::StateAfter(after) => write!(f, "{after}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::ArrayIndex(idx) => write!(f, "[{idx}]")?,
                Segment::MapKey(key) => write!(f, "{}", KeySegment(key))?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root() -> Path {
        Path::state_after(StateAfter::new("cap", vec![2]))
    }

    #[test]
    fn extensions_share_the_parent_link() {
        let base = root().field("textures");
        let a = base.index(0);
        let b = base.index(1);
        assert!(a.parent().is_some_and(|p| p.ptr_eq(&base)));
        assert!(b.parent().is_some_and(|p| p.ptr_eq(&base)));
        assert_eq!(a.depth(), 2);
    }

    #[test]
    fn segments_run_root_to_leaf() {
        let path = root().field("objects").key(MapKey::from(4u64)).index(9);
        let segments: Vec<_> = path.segments().cloned().collect();
        assert_eq!(
            segments,
            vec![
                Segment::StateAfter(StateAfter::new("cap", vec![2])),
                Segment::Field(Arc::from("objects")),
                Segment::MapKey(MapKey::Uint(4)),
                Segment::ArrayIndex(9),
            ]
        );
        assert_eq!(path.root(), &StateAfter::new("cap", vec![2]));
    }

    #[test]
    fn display_and_serialize_use_the_same_grammar() {
        let path = root().field("programs").key(MapKey::from("main")).index(1);
        assert_eq!(path.to_string(), r#"after(cap, [2]).programs["main"][1]"#);
        assert_eq!(
            serde_json::to_value(&path).expect("serialize"),
            serde_json::json!(r#"after(cap, [2]).programs["main"][1]"#)
        );
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(root().field("a").index(3), root().field("a").index(3));
        assert_ne!(root().field("a").index(3), root().field("a").index(4));
        assert_ne!(root().field("a"), root().field("a").index(0));
    }
}
