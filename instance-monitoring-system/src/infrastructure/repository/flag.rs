use std::sync::Arc;

use async_trait::async_trait;
use domain_billing::repository::MonitoringFlagRepo;
use typed_builder::TypedBuilder;

use crate::infrastructure::database::RedisClient;

/// Group flags as redis keys set with `SET key 1 NX EX ttl`.
#[derive(TypedBuilder)]
pub struct RedisMonitoringFlagRepo {
    client: Arc<RedisClient>,
}

#[async_trait]
impl MonitoringFlagRepo for RedisMonitoringFlagRepo {
    async fn try_acquire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(1).arg("NX").arg("EX").arg(ttl_secs.max(1));
        // `OK` when set, nil when someone holds the flag.
        let reply: Option<String> = connection.query(&cmd)?;
        Ok(reply.is_some())
    }
}
