use async_trait::async_trait;
use uuid::Uuid;

use crate::model::entity::InstanceMeta;

/// Durable home of instance metadata, and so of the watermarks.
#[async_trait]
pub trait InstanceMetaRepo: Send + Sync {
    /// `Ok(None)` when nothing was stored for the instance yet.
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<InstanceMeta>>;

    async fn save(&self, id: Uuid, meta: &InstanceMeta) -> anyhow::Result<()>;
}
