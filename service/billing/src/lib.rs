mod accrual;
mod clock;
mod handler;
mod lazy;
mod monitoring;
mod state;
mod timeline;

pub use accrual::{capacity_billing, static_billing, Accrued};
pub use clock::UtcClock;
pub use handler::HandlerRegistry;
pub use lazy::Lazy;
pub use monitoring::MonitoringServiceImpl;
pub use state::{map_code, map_state};
pub use timeline::{build_timeline, filter_timeline, Timeline};
