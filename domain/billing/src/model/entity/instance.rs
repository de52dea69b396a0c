use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::BillingPlan;
use crate::exception::{BillingException, BillingResult};

/// A tracked, billable VM.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Id of the VM on the orchestration platform.
    pub vm_id: i64,
    /// Unix seconds; the accrual starting point when nothing was billed yet.
    pub created: i64,
    /// Selected product, only meaningful for static plans.
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub billing_plan: Option<BillingPlan>,
    #[serde(default)]
    pub meta: InstanceMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InstanceGroup {
    pub id: Uuid,
    pub title: String,
}

/// Where a watermark lives inside [`InstanceMeta`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatermarkKey {
    /// Static plans: `last_monitoring`.
    Global,
    /// Metered resources: `<key>_last_monitoring`.
    Resource(String),
}

impl fmt::Display for WatermarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkKey::Global => f.write_str("last_monitoring"),
            WatermarkKey::Resource(key) => write!(f, "{key}_last_monitoring"),
        }
    }
}

/// Persisted string keyed metadata of an instance, carrying the watermarks across passes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct InstanceMeta(Map<String, Value>);

impl InstanceMeta {
    /// `Ok(None)` only when the key is absent. Integral floats such as `120.0` are accepted,
    /// anything else stored under the key is malformed.
    pub fn watermark(&self, key: &WatermarkKey) -> BillingResult<Option<i64>> {
        let name = key.to_string();
        let Some(value) = self.0.get(&name) else {
            return Ok(None);
        };
        let parsed = value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|x| x.is_finite() && x.fract() == 0.0)
                .filter(|x| *x >= i64::MIN as f64 && *x < i64::MAX as f64)
                .map(|x| x as i64)
        });
        match parsed {
            Some(last) => Ok(Some(last)),
            None => Err(BillingException::MalformedWatermark {
                key: name,
                value: value.to_string(),
            }),
        }
    }

    pub fn set_watermark(&mut self, key: &WatermarkKey, last: i64) {
        self.0.insert(key.to_string(), Value::from(last));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for InstanceMeta {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
