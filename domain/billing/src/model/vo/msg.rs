use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CanonicalState;

/// Current state of an instance as seen by the latest monitoring pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStateMsg {
    pub instance_id: Uuid,
    pub state: CanonicalState,
    pub meta: serde_json::Map<String, serde_json::Value>,
    pub observed_at: DateTime<Utc>,
}
