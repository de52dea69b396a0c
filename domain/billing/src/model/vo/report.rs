use uuid::Uuid;

use crate::model::entity::{BillingRecord, InstanceMeta};

/// Outcome of one accrual pass over one instance.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub instance_id: Uuid,
    pub records: Vec<BillingRecord>,
    /// Metadata with the advanced watermarks.
    pub meta: InstanceMeta,
    /// Resources or products skipped because of their configuration.
    pub skipped: Vec<String>,
    /// Whether the advanced watermarks were written back.
    pub persisted: bool,
}

/// Outcome of one scheduled monitoring cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: i64,
    pub groups_run: Vec<Uuid>,
    /// Groups another cycle was already holding.
    pub groups_skipped: Vec<Uuid>,
    pub passes: usize,
    pub failures: usize,
}
