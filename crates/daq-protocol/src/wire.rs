use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host/pid pair a peer reports about itself on `plat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcInfo {
    pub host: String,
    pub pid: u32,
}

/// What the manager knows about one peer, keyed by level then id in
/// `cmstate` (see `daq_state`/the manager's registry).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerRecord {
    pub level: String,
    pub id: String,
    pub proc_info: ProcInfo,
    #[serde(default)]
    pub connect_info: Value,
    pub active: bool,
    #[serde(default)]
    pub level_index: usize,
}

impl PeerRecord {
    pub fn new(level: impl Into<String>, id: impl Into<String>, proc_info: ProcInfo) -> Self {
        Self {
            level: level.into(),
            id: id.into(),
            proc_info,
            connect_info: Value::Null,
            active: true,
            level_index: 0,
        }
    }
}
