//! # Stateview Path
//!
//! Addresses for values inside the state of a captured execution.
//!
//! A [`Path`] is an immutable chain of segments rooted at the state after a
//! recorded command:
//!
//! ```text
//! after(capture, [12])
//!     │
//!     ├──> .buffers          (field)
//!     │      └──> [3]        (array index)
//!     │             └──> ["usage"]  (map key)
//! ```
//!
//! Every extension allocates one link that points at its parent, so sibling
//! paths share their common prefix and nothing is ever copied in full.
//!
//! ## Example
//!
//! ```rust
//! use stateview_path::{MapKey, Path, StateAfter};
//!
//! let root = Path::state_after(StateAfter::new("c0ffee", vec![12]));
//! let path = root.field("buffers").index(3).key(MapKey::from("usage"));
//! assert_eq!(path.to_string(), r#"after(c0ffee, [12]).buffers[3]["usage"]"#);
//! assert_eq!(path.depth(), 3);
//! ```

mod command;
mod key;
mod path;

pub use command::{CaptureId, StateAfter};
pub use key::MapKey;
pub use path::{Path, Segment, Segments};
