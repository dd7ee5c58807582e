//! In-memory instance repository

use crate::error::RepositoryError;
use crate::repository::InstanceRepository;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use marquee_types::{Instance, InstanceKey};

/// In-memory instance repository
pub struct InMemoryInstanceRepository {
    instances: DashMap<InstanceKey, Instance>,
}

impl InMemoryInstanceRepository {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for InMemoryInstanceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn save(&self, instance: &Instance) -> Result<(), RepositoryError> {
        self.instances.insert(instance.key(), instance.clone());
        Ok(())
    }

    async fn save_unless_in_progress(&self, instance: &Instance) -> Result<(), RepositoryError> {
        match self.instances.entry(instance.key()) {
            Entry::Occupied(mut entry) => {
                let actual = entry.get().status;
                if actual.is_in_progress() {
                    return Err(RepositoryError::Conflict {
                        key: instance.key(),
                        actual,
                    });
                }
                entry.insert(instance.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(instance.clone());
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, playbook_id: &str, id: &str) -> Result<Instance, RepositoryError> {
        let key = InstanceKey::new(playbook_id, id);
        self.instances
            .get(&key)
            .map(|i| i.clone())
            .ok_or(RepositoryError::NotFound(key))
    }

    async fn find_by_playbook_id(
        &self,
        playbook_id: &str,
    ) -> Result<Vec<Instance>, RepositoryError> {
        let mut result: Vec<Instance> = self
            .instances
            .iter()
            .filter(|i| i.playbook_id == playbook_id)
            .map(|i| i.value().clone())
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(result)
    }

    async fn delete(&self, key: &InstanceKey) -> Result<(), RepositoryError> {
        self.instances
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_types::InstanceStatus;

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryInstanceRepository::new();
        repo.save(&Instance::new("web", "b")).await.unwrap();
        repo.save(&Instance::new("web", "a")).await.unwrap();
        repo.save(&Instance::new("api", "c")).await.unwrap();

        let found = repo.find_by_id("web", "a").await.unwrap();
        assert_eq!(found.id, "a");

        let ids: Vec<String> = repo
            .find_by_playbook_id("web")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let err = repo.find_by_id("web", "zzz").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_save_unless_in_progress() {
        let repo = InMemoryInstanceRepository::new();
        let instance = Instance::new("web", "a");

        // No record yet: inserts
        repo.save_unless_in_progress(&instance.clone().with_status(InstanceStatus::Deploying))
            .await
            .unwrap();

        // Stored status is now Deploying
        let err = repo
            .save_unless_in_progress(&instance.clone().with_status(InstanceStatus::Deleting))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Conflict {
                key: instance.key(),
                actual: InstanceStatus::Deploying,
            }
        );

        // Settled statuses never block, whatever the caller last saw
        repo.save(&instance.clone().with_status(InstanceStatus::Error))
            .await
            .unwrap();
        repo.save_unless_in_progress(&instance.clone().with_status(InstanceStatus::Deleting))
            .await
            .unwrap();
        assert_eq!(
            repo.find_by_id("web", "a").await.unwrap().status,
            InstanceStatus::Deleting
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryInstanceRepository::new();
        let instance = Instance::new("web", "a");
        repo.save(&instance).await.unwrap();

        repo.delete(&instance.key()).await.unwrap();
        assert!(repo.is_empty());
        assert!(repo.delete(&instance.key()).await.unwrap_err().is_not_found());
    }
}
