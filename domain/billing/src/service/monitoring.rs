use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    exception::BillingResult,
    model::vo::{CycleReport, PassReport},
};

#[async_trait]
pub trait MonitoringService: Send + Sync {
    /// Run a scheduled cycle over every group not already held by another cycle.
    async fn run_cycle(&self, cycle: i64) -> anyhow::Result<CycleReport>;

    /// Run the accrual pass of every instance in a group concurrently.
    async fn monitor_group(&self, group_id: Uuid) -> anyhow::Result<Vec<BillingResult<PassReport>>>;

    /// Run the accrual pass of one instance.
    async fn monitor_instance(&self, instance_id: Uuid) -> BillingResult<PassReport>;
}
