//! JSON capture documents.
//!
//! A capture document records the API state after selected commands, the
//! memory observed by the trace and the constant sets of the API:
//!
//! ```json
//! {
//!   "capture": "c0ffee",
//!   "api": "gles",
//!   "layout": { "pointer_size": 8, "endian": "little" },
//!   "memory": [{ "pool": 0, "base": 4096, "bytes": "AAECAw==" }],
//!   "constant_sets": [{ "index": 1, "name": "Usage", "constants": [] }],
//!   "states": [{ "command": 0, "state": { "uint": 1 } }]
//! }
//! ```
//!
//! States only need to be recorded where they change: the state after
//! command `n` is the latest one recorded at or before `n`.

use crate::constants::{ApiId, ConstantSet, StaticConstants};
use crate::error::{Result, TreeError};
use crate::memory::{MemoryLayout, PoolId, PoolMemory};
use crate::snapshot::{Snapshot, SnapshotProvider};
use crate::value::Value;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use stateview_path::{CaptureId, StateAfter};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDocument {
    pub capture: CaptureId,
    pub api: ApiId,
    #[serde(default)]
    pub layout: MemoryLayout,
    #[serde(default)]
    pub memory: Vec<MemoryRegion>,
    #[serde(default)]
    pub constant_sets: Vec<IndexedConstantSet>,
    pub states: Vec<CommandState>,
}

/// Observed bytes, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub pool: PoolId,
    pub base: u64,
    pub bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedConstantSet {
    pub index: u32,
    #[serde(flatten)]
    pub set: ConstantSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandState {
    pub command: u64,
    pub state: Value,
}

/// Snapshot provider over a loaded capture document
pub struct CaptureFile {
    capture: CaptureId,
    api: ApiId,
    layout: MemoryLayout,
    memory: Arc<PoolMemory>,
    constants: Arc<StaticConstants>,
    states: BTreeMap<u64, Value>,
}

impl CaptureFile {
    pub fn from_document(doc: CaptureDocument) -> Result<Self> {
        let mut memory = PoolMemory::new();
        for region in doc.memory {
            let bytes = STANDARD.decode(region.bytes.as_bytes()).map_err(|e| {
                TreeError::snapshot(format!(
                    "memory region at 0x{:x} in pool {} is not valid base64: {e}",
                    region.base, region.pool
                ))
            })?;
            memory.write(region.pool, region.base, bytes);
        }

        let mut constants = StaticConstants::new();
        for entry in doc.constant_sets {
            constants.insert(doc.api.clone(), entry.index, entry.set);
        }

        let states = doc
            .states
            .into_iter()
            .map(|s| (s.command, s.state))
            .collect();

        Ok(Self {
            capture: doc.capture,
            api: doc.api,
            layout: doc.layout,
            memory: Arc::new(memory),
            constants: Arc::new(constants),
            states,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: CaptureDocument = serde_json::from_str(json)
            .map_err(|e| TreeError::snapshot(format!("invalid capture document: {e}")))?;
        Self::from_document(doc)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TreeError::snapshot(format!("cannot read capture {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn capture(&self) -> &CaptureId {
        &self.capture
    }

    pub fn api(&self) -> &ApiId {
        &self.api
    }

    /// Registry with the document's constant sets.
    pub fn constants(&self) -> Arc<StaticConstants> {
        self.constants.clone()
    }
}

impl SnapshotProvider for CaptureFile {
    fn state_after(&self, after: &StateAfter) -> Result<Snapshot> {
        if after.capture != self.capture {
            return Err(TreeError::snapshot(format!(
                "capture {} is not loaded (have {})",
                after.capture, self.capture
            )));
        }
        if after.is_nested() {
            return Err(TreeError::unsupported(format!(
                "{after} addresses a sub-command"
            )));
        }
        let command = after
            .top_level_command()
            .ok_or_else(|| TreeError::unsupported(format!("{after} does not name a command")))?;
        let (_, root) = self.states.range(..=command).next_back().ok_or_else(|| {
            TreeError::snapshot(format!("no state recorded at or before command {command}"))
        })?;
        Ok(Snapshot {
            api: self.api.clone(),
            root: root.clone(),
            layout: self.layout,
            memory: self.memory.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "capture": "cap",
        "api": "gles",
        "layout": { "pointer_size": 4 },
        "memory": [{ "pool": 0, "base": 16, "bytes": "AQIDBA==" }],
        "constant_sets": [{ "index": 2, "name": "Mode", "constants": [{ "name": "ON", "value": 1 }] }],
        "states": [
            { "command": 0, "state": { "uint": 10 } },
            { "command": 5, "state": { "uint": 50 } }
        ]
    }"#;

    #[test]
    fn state_after_uses_latest_recorded_state() {
        let capture = CaptureFile::from_json(DOC).expect("parse");
        let at = |cmd| {
            capture
                .state_after(&StateAfter::new("cap", vec![cmd]))
                .map(|s| s.root)
        };
        assert_eq!(at(0).expect("0"), Value::Uint(10));
        assert_eq!(at(4).expect("4"), Value::Uint(10));
        assert_eq!(at(9).expect("9"), Value::Uint(50));
    }

    #[test]
    fn rejects_other_captures_and_sub_commands() {
        let capture = CaptureFile::from_json(DOC).expect("parse");
        assert!(matches!(
            capture.state_after(&StateAfter::new("other", vec![1])),
            Err(TreeError::Snapshot(_))
        ));
        assert!(matches!(
            capture.state_after(&StateAfter::new("cap", vec![1, 0])),
            Err(TreeError::Unsupported(_))
        ));
    }

    #[test]
    fn loads_memory_and_constants() {
        use crate::constants::ConstantRegistry;
        use crate::memory::{ElementType, MemoryPointer, MemoryReader};

        let capture = CaptureFile::from_json(DOC).expect("parse");
        let snapshot = capture
            .state_after(&StateAfter::new("cap", vec![0]))
            .expect("snapshot");
        let word = snapshot
            .memory
            .load(
                &MemoryPointer {
                    pool: 0,
                    address: 16,
                    element: ElementType::U32,
                },
                &snapshot.layout,
            )
            .expect("load");
        assert_eq!(word, Value::Uint(0x0403_0201));

        let set = capture
            .constants()
            .constant_set(capture.api(), 2)
            .expect("constant set");
        assert_eq!(set.name_of(1), Some("ON"));
    }

    #[test]
    fn invalid_base64_is_a_snapshot_error() {
        let doc = DOC.replace("AQIDBA==", "***");
        assert!(matches!(
            CaptureFile::from_json(&doc),
            Err(TreeError::Snapshot(_))
        ));
    }
}
