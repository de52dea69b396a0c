use domain_billing::service::Clock;

#[derive(Default, Clone, Copy)]
pub struct UtcClock;

impl Clock for UtcClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
