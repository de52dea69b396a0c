use crate::model::entity::VmDescriptor;

/// Measures how much of a metered resource a VM holds.
pub trait ResourceHandler: Send + Sync {
    fn amount(&self, vm: &VmDescriptor) -> f64;
}

impl<F> ResourceHandler for F
where
    F: Fn(&VmDescriptor) -> f64 + Send + Sync,
{
    fn amount(&self, vm: &VmDescriptor) -> f64 {
        self(vm)
    }
}
