use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a record charges for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BillingSubject {
    Resource(String),
    Product(String),
}

impl fmt::Display for BillingSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingSubject::Resource(key) => write!(f, "resource:{key}"),
            BillingSubject::Product(key) => write!(f, "product:{key}"),
        }
    }
}

/// An emitted billing fact. Append only: never mutated nor reissued for the same window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    /// Deterministic over `(instance, subject, start, end)`.
    pub id: Uuid,
    #[serde(flatten)]
    pub subject: BillingSubject,
    pub instance: Uuid,
    pub start: i64,
    pub end: i64,
    pub exec: i64,
    pub total: f64,
}

impl BillingRecord {
    pub fn new(
        subject: BillingSubject,
        instance: Uuid,
        start: i64,
        end: i64,
        exec: i64,
        total: f64,
    ) -> Self {
        let id = Uuid::new_v5(&instance, format!("{subject}/{start}/{end}").as_bytes());
        Self {
            id,
            subject,
            instance,
            start,
            end,
            exec,
            total,
        }
    }
}
