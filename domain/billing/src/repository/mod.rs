mod flag;
mod instance;
mod meta;
mod vm;

#[rustfmt::skip]
pub use {
    flag::MonitoringFlagRepo,
    instance::InstanceRepo,
    meta::InstanceMetaRepo,
    vm::VmRepo,
};
