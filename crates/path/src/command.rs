use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a loaded capture (as handed out by the capture loader)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(Arc<str>);

impl CaptureId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaptureId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The state of a capture after a recorded command has executed.
///
/// `command` holds one index per nesting level: `[12]` is the twelfth
/// top-level command, `[12, 3]` the third sub-command issued by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateAfter {
    pub capture: CaptureId,
    pub command: Vec<u64>,
}

impl StateAfter {
    pub fn new(capture: impl Into<CaptureId>, command: Vec<u64>) -> Self {
        Self {
            capture: capture.into(),
            command,
        }
    }

    /// True when the address descends into sub-commands.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.command.len() > 1
    }

    /// Index of the top-level command, if any.
    #[must_use]
    pub fn top_level_command(&self) -> Option<u64> {
        self.command.first().copied()
    }
}

impl fmt::Display for StateAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "after({}, [", self.capture)?;
        for (i, idx) in self.command.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{idx}")?;
        }
        f.write_str("])")
    }
}
