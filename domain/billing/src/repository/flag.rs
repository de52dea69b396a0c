use async_trait::async_trait;

#[async_trait]
pub trait MonitoringFlagRepo: Send + Sync {
    /// Set the flag if nobody holds it. `Ok(false)` when it is already held.
    async fn try_acquire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool>;
}
