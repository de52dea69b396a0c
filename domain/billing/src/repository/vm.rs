use async_trait::async_trait;

use crate::model::entity::VmDescriptor;

#[async_trait]
pub trait VmRepo: Send + Sync {
    /// Fetch the descriptor, history included, of a VM from the orchestration platform.
    async fn get_vm(&self, vm_id: i64) -> anyhow::Result<VmDescriptor>;
}
