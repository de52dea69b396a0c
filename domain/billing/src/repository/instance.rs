use async_trait::async_trait;
use uuid::Uuid;

use crate::model::entity::{Instance, InstanceGroup, InstanceMeta};

#[async_trait]
pub trait InstanceRepo: Send + Sync {
    async fn list_groups(&self) -> anyhow::Result<Vec<InstanceGroup>>;

    async fn get_by_group(&self, group_id: Uuid) -> anyhow::Result<Vec<Instance>>;

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Instance>;

    /// Replace the persisted metadata of an instance.
    async fn update_meta(&self, id: Uuid, meta: InstanceMeta) -> anyhow::Result<()>;
}
