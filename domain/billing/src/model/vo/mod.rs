pub mod msg;
pub mod record;
pub mod report;
pub mod state;

#[rustfmt::skip]
pub use {
    msg::InstanceStateMsg,
    record::Record,
    report::{CycleReport, PassReport},
    state::{CanonicalState, LcmState, StateCode, VmState},
};
