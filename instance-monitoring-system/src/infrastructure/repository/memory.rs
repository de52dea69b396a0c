use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use domain_billing::{
    model::entity::{Instance, InstanceGroup, InstanceMeta},
    repository::{InstanceMetaRepo, InstanceRepo},
};
use uuid::Uuid;

use crate::infrastructure::config::GroupConfig;

/// Instances and groups kept in memory, seeded from the configuration.
///
/// With a meta store attached, stored metadata overrides the seeded one and every update is
/// saved there first, so watermarks survive restarts.
#[derive(Default)]
pub struct MemoryInstanceRepo {
    groups: DashMap<Uuid, InstanceGroup>,
    instances: DashMap<Uuid, Instance>,
    meta_repo: Option<Arc<dyn InstanceMetaRepo>>,
}

impl MemoryInstanceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(groups: &[GroupConfig]) -> Self {
        let repo = Self::new();
        for group in groups {
            repo.groups.insert(
                group.id,
                InstanceGroup {
                    id: group.id,
                    title: group.title.clone(),
                },
            );
            for instance in &group.instances {
                repo.instances.insert(instance.id, instance.clone().into_instance(group.id));
            }
        }
        repo
    }

    pub fn with_meta_repo(mut self, meta_repo: Arc<dyn InstanceMetaRepo>) -> Self {
        self.meta_repo = Some(meta_repo);
        self
    }

    async fn load(&self, mut instance: Instance) -> anyhow::Result<Instance> {
        if let Some(meta_repo) = &self.meta_repo {
            if let Some(meta) = meta_repo.load(instance.id).await? {
                instance.meta = meta;
            }
        }
        Ok(instance)
    }
}

#[async_trait]
impl InstanceRepo for MemoryInstanceRepo {
    async fn list_groups(&self) -> anyhow::Result<Vec<InstanceGroup>> {
        let mut groups: Vec<_> = self.groups.iter().map(|g| g.value().clone()).collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn get_by_group(&self, group_id: Uuid) -> anyhow::Result<Vec<Instance>> {
        let seeded: Vec<_> = self
            .instances
            .iter()
            .filter(|i| i.group_id == group_id)
            .map(|i| i.value().clone())
            .collect();
        let mut instances = Vec::with_capacity(seeded.len());
        for instance in seeded {
            instances.push(self.load(instance).await?);
        }
        Ok(instances)
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Instance> {
        let instance = self
            .instances
            .get(&id)
            .map(|i| i.value().clone())
            .ok_or_else(|| anyhow::anyhow!("No such instance: {id}"))?;
        self.load(instance).await
    }

    async fn update_meta(&self, id: Uuid, meta: InstanceMeta) -> anyhow::Result<()> {
        if !self.instances.contains_key(&id) {
            anyhow::bail!("No such instance: {id}");
        }
        if let Some(meta_repo) = &self.meta_repo {
            meta_repo.save(id, &meta).await?;
        }
        if let Some(mut instance) = self.instances.get_mut(&id) {
            instance.meta = meta;
        }
        Ok(())
    }
}
