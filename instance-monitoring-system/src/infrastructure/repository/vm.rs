use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use domain_billing::{model::entity::VmDescriptor, repository::VmRepo};
use typed_builder::TypedBuilder;

/// Reads VM descriptors from the orchestration platform's HTTP API.
#[derive(TypedBuilder)]
pub struct PlatformVmRepo {
    client: Arc<reqwest::Client>,
    #[builder(setter(into))]
    endpoint: String,
}

impl PlatformVmRepo {
    fn url(&self, vm_id: i64) -> String {
        format!("{}/vms/{vm_id}", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl VmRepo for PlatformVmRepo {
    async fn get_vm(&self, vm_id: i64) -> anyhow::Result<VmDescriptor> {
        let response = self
            .client
            .get(self.url(vm_id))
            .send()
            .await
            .with_context(|| format!("Cannot reach platform for vm: {vm_id}"))?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let repo = PlatformVmRepo::builder()
            .client(Arc::new(reqwest::Client::new()))
            .endpoint("http://platform:2633/")
            .build();
        assert_eq!(repo.url(42), "http://platform:2633/vms/42");
    }
}
