use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use domain_billing::{model::entity::InstanceMeta, repository::InstanceMetaRepo};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::infrastructure::database::RedisClient;

/// Instance metadata as JSON strings under `instance-meta:{id}`, without expiry.
#[derive(TypedBuilder)]
pub struct RedisInstanceMetaRepo {
    client: Arc<RedisClient>,
}

fn meta_key(id: Uuid) -> String {
    format!("instance-meta:{id}")
}

#[async_trait]
impl InstanceMetaRepo for RedisInstanceMetaRepo {
    async fn load(&self, id: Uuid) -> anyhow::Result<Option<InstanceMeta>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let mut cmd = redis::cmd("GET");
        cmd.arg(meta_key(id));
        let stored: Option<String> = connection.query(&cmd)?;
        stored
            .map(|json| {
                serde_json::from_str(&json)
                    .with_context(|| format!("Stored metadata of instance: {id} is not a map"))
            })
            .transpose()
    }

    async fn save(&self, id: Uuid, meta: &InstanceMeta) -> anyhow::Result<()> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(meta_key(id)).arg(serde_json::to_string(meta)?);
        let _: String = connection.query(&cmd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_key() {
        assert_eq!(meta_key(Uuid::nil()), "instance-meta:00000000-0000-0000-0000-000000000000");
    }
}
