mod flag;
mod memory;
mod meta;
mod vm;

#[rustfmt::skip]
pub use {
    flag::RedisMonitoringFlagRepo,
    memory::MemoryInstanceRepo,
    meta::RedisInstanceMetaRepo,
    vm::PlatformVmRepo,
};
