use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use crate::{
    exception::BillingResult,
    model::{
        entity::{Instance, InstanceGroup, InstanceMeta, VmDescriptor},
        vo::{CycleReport, PassReport},
    },
    repository::{InstanceMetaRepo, InstanceRepo, MonitoringFlagRepo, VmRepo},
    service::MonitoringService,
};

mock! {
    pub VmRepo {}
    #[async_trait]
    impl VmRepo for VmRepo {
        async fn get_vm(&self, vm_id: i64) -> anyhow::Result<VmDescriptor>;
    }
}

mock! {
    pub InstanceRepo {}
    #[async_trait]
    impl InstanceRepo for InstanceRepo {
        async fn list_groups(&self) -> anyhow::Result<Vec<InstanceGroup>>;
        async fn get_by_group(&self, group_id: Uuid) -> anyhow::Result<Vec<Instance>>;
        async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Instance>;
        async fn update_meta(&self, id: Uuid, meta: InstanceMeta) -> anyhow::Result<()>;
    }
}

mock! {
    pub InstanceMetaRepo {}
    #[async_trait]
    impl InstanceMetaRepo for InstanceMetaRepo {
        async fn load(&self, id: Uuid) -> anyhow::Result<Option<InstanceMeta>>;
        async fn save(&self, id: Uuid, meta: &InstanceMeta) -> anyhow::Result<()>;
    }
}

mock! {
    pub MonitoringFlagRepo {}
    #[async_trait]
    impl MonitoringFlagRepo for MonitoringFlagRepo {
        async fn try_acquire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool>;
    }
}

mock! {
    pub MonitoringService {}
    #[async_trait]
    impl MonitoringService for MonitoringService {
        async fn run_cycle(&self, cycle: i64) -> anyhow::Result<CycleReport>;
        async fn monitor_group(&self, group_id: Uuid) -> anyhow::Result<Vec<BillingResult<PassReport>>>;
        async fn monitor_instance(&self, instance_id: Uuid) -> BillingResult<PassReport>;
    }
}
