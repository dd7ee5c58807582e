//! Instance repository trait

use crate::error::RepositoryError;
use async_trait::async_trait;
use marquee_types::{Instance, InstanceKey};

/// Persistence for instances
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert or replace an instance
    async fn save(&self, instance: &Instance) -> Result<(), RepositoryError>;

    /// Insert or replace an instance unless its stored record is
    /// `Deploying` or `Deleting`.
    ///
    /// Fails with `RepositoryError::Conflict` carrying the stored status,
    /// leaving the record untouched. The check and the write are atomic.
    async fn save_unless_in_progress(&self, instance: &Instance) -> Result<(), RepositoryError>;

    /// Get an instance, failing with `RepositoryError::NotFound`
    async fn find_by_id(&self, playbook_id: &str, id: &str) -> Result<Instance, RepositoryError>;

    /// All instances of a playbook, ordered by ID
    async fn find_by_playbook_id(&self, playbook_id: &str)
        -> Result<Vec<Instance>, RepositoryError>;

    /// Remove an instance, failing with `RepositoryError::NotFound`
    async fn delete(&self, key: &InstanceKey) -> Result<(), RepositoryError>;
}
