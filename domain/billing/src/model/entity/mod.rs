pub mod billing_record;
pub mod instance;
pub mod plan;
pub mod vm;

#[rustfmt::skip]
pub use {
    billing_record::{BillingRecord, BillingSubject},
    instance::{Instance, InstanceGroup, InstanceMeta, WatermarkKey},
    plan::{BillingKind, BillingPlan, PlanKind, ProductConf, ResourceConf},
    vm::{HistoryRecord, VmDescriptor},
};
