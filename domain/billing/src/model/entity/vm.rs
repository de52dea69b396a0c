use serde::{Deserialize, Serialize};

use crate::model::vo::StateCode;

/// What the orchestration platform reports about one VM.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VmDescriptor {
    pub id: i64,
    pub name: String,
    /// State at fetch time.
    #[serde(flatten)]
    pub state: StateCode,
    pub vcpu: f64,
    /// Memory size in MiB.
    pub memory: u64,
    #[serde(default)]
    pub public_ips: u32,
    #[serde(default)]
    pub private_ips: u32,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

/// One hosting segment. It starts at `start` and lasts until the next segment starts.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub seq: u32,
    pub hostname: String,
    pub start: i64,
    /// State the VM was in during this segment.
    #[serde(flatten)]
    pub state: StateCode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn deserialize_descriptor() {
        let raw = indoc! {r#"
            {
                "id": 42,
                "name": "vm-42",
                "state": 3,
                "lcmState": 3,
                "lcmStateName": "RUNNING",
                "vcpu": 2.0,
                "memory": 4096,
                "publicIps": 1,
                "history": [
                    { "seq": 0, "hostname": "node-a", "start": 100, "state": 3, "lcmState": 2, "lcmStateName": "BOOT" },
                    { "seq": 1, "hostname": "node-a", "start": 160, "state": 3, "lcmState": 3 }
                ]
            }
        "#};
        let vm: VmDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(vm.state.lcm_state_name, "RUNNING");
        assert_eq!(vm.private_ips, 0);
        assert_eq!(vm.history.len(), 2);
        assert_eq!(vm.history[1].state.lcm_state_name, "");
    }
}
