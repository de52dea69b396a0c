use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Platform independent lifecycle state every consumer works with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, Hash, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalState {
    Init,
    Running,
    Stopped,
    Suspended,
    Deleted,
    Failure,
    Operation,
    #[default]
    Unknown,
}

/// Primary VM state codes reported by the platform.
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Init = 0,
    Pending = 1,
    Hold = 2,
    Active = 3,
    Stopped = 4,
    Suspended = 5,
    Done = 6,
    Failed = 7,
    Poweroff = 8,
    Undeployed = 9,
    Cloning = 10,
    CloningFailure = 11,
}

/// Life cycle sub-state codes, only meaningful while the VM is `Active`.
#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcmState {
    LcmInit = 0,
    Prolog = 1,
    Boot = 2,
    Running = 3,
    Migrate = 4,
    SaveStop = 5,
    SaveSuspend = 6,
    SaveMigrate = 7,
    PrologMigrate = 8,
    PrologResume = 9,
    EpilogStop = 10,
    Epilog = 11,
    Shutdown = 12,
    CleanupResubmit = 15,
    Unknown = 16,
    Hotplug = 17,
    ShutdownPoweroff = 18,
    BootUnknown = 19,
    BootPoweroff = 20,
    BootSuspended = 21,
    BootStopped = 22,
    CleanupDelete = 23,
    HotplugSnapshot = 24,
    HotplugNic = 25,
    HotplugSaveas = 26,
    HotplugSaveasPoweroff = 27,
    HotplugSaveasSuspended = 28,
    ShutdownUndeploy = 29,
    EpilogUndeploy = 30,
    PrologUndeploy = 31,
    BootUndeploy = 32,
    HotplugPrologPoweroff = 33,
    HotplugEpilogPoweroff = 34,
    BootMigrate = 35,
    BootFailure = 36,
    BootMigrateFailure = 37,
    PrologMigrateFailure = 38,
    PrologFailure = 39,
    EpilogFailure = 40,
}

/// The raw triple the platform reports for a VM at some point of its life.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StateCode {
    pub state: i32,
    pub lcm_state: i32,
    /// Human readable name of `lcm_state`, e.g. `BOOT_FAILURE`.
    #[serde(default)]
    pub lcm_state_name: String,
}

impl StateCode {
    pub fn new(state: i32, lcm_state: i32, lcm_state_name: impl Into<String>) -> Self {
        Self {
            state,
            lcm_state,
            lcm_state_name: lcm_state_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn canonical_state_wire_names() {
        let on: Vec<CanonicalState> = serde_json::from_str(r#"["RUNNING","OPERATION"]"#).unwrap();
        assert_eq!(on, vec![CanonicalState::Running, CanonicalState::Operation]);
        assert_eq!(
            serde_json::to_string(&CanonicalState::Suspended).unwrap(),
            r#""SUSPENDED""#
        );
    }

    #[test]
    fn codes_out_of_range() {
        assert_eq!(VmState::from_i32(8), Some(VmState::Poweroff));
        assert_eq!(VmState::from_i32(42), None);
        assert_eq!(LcmState::from_i32(13), None);
    }
}
