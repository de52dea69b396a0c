use std::{collections::HashMap, sync::Arc};

use domain_billing::{model::entity::VmDescriptor, service::ResourceHandler};

/// Resource key to handler table, built once at startup and handed to the monitoring service.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `cpu` in vCPUs, `ram` in GiB, `ips_public` and `ips_private` in addresses.
    pub fn standard() -> Self {
        Self::new()
            .with("cpu", |vm: &VmDescriptor| vm.vcpu)
            .with("ram", |vm: &VmDescriptor| vm.memory as f64 / 1024.0)
            .with("ips_public", |vm: &VmDescriptor| vm.public_ips as f64)
            .with("ips_private", |vm: &VmDescriptor| vm.private_ips as f64)
    }

    pub fn with(mut self, key: impl Into<String>, handler: impl ResourceHandler + 'static) -> Self {
        self.handlers.insert(key.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn ResourceHandler>> {
        self.handlers.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
