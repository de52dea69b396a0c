//! Commands to interact with infrastructure

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command to the monitoring worker, run outside of the schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MonitoringCommand {
    /// Monitor every instance of a group, ignoring the cycle flag.
    RunGroup {
        /// Group id.
        group_id: Uuid,
    },

    /// Monitor one instance.
    RunInstance {
        /// Instance id.
        instance_id: Uuid,
    },
}
