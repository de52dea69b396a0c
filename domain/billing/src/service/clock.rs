/// Source of "now" in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}
