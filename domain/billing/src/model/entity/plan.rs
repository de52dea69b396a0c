use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::vo::CanonicalState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingKind {
    /// Billed in advance for the upcoming period.
    Prepaid,
    /// Billed once a period has fully elapsed.
    #[default]
    Postpaid,
}

/// A capacity metered resource, e.g. `cpu` or `ram`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceConf {
    pub key: String,
    #[serde(default)]
    pub kind: BillingKind,
    /// Period in seconds.
    pub period: i64,
    pub price: f64,
    /// States in which the resource is billable.
    #[serde(default)]
    pub on: HashSet<CanonicalState>,
    /// Inverts `on`: bill in every state except those listed.
    #[serde(default)]
    pub except: bool,
}

impl ResourceConf {
    pub fn is_billable(&self, state: CanonicalState) -> bool {
        self.on.contains(&state) != self.except
    }
}

/// Flat subscription billing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProductConf {
    #[serde(default)]
    pub kind: BillingKind,
    /// Period in seconds.
    pub period: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanKind {
    /// One product per instance, independent of VM state.
    Static,
    /// Per resource metering.
    #[default]
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BillingPlan {
    pub id: Uuid,
    #[serde(default)]
    pub kind: PlanKind,
    #[serde(default)]
    pub resources: Vec<ResourceConf>,
    #[serde(default)]
    pub products: HashMap<String, ProductConf>,
}
