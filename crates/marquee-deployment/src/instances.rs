//! Instance Service - instance records
//!
//! Creation validates the ID and the vars against the playbook before
//! anything is written.

use crate::error::{DeploymentError, Result};
use crate::events::EventPublisher;
use marquee_notify::Notifier;
use marquee_registry::{InstanceRepository, PlaybookCatalog, RepositoryError};
use marquee_types::{
    validate_instance_id, Attachment, Instance, InstanceEvent, InstanceStatus, Message, Playbook,
    Vars,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates, updates, lists and deletes instances
pub struct InstanceService {
    playbooks: Arc<PlaybookCatalog>,
    repository: Arc<dyn InstanceRepository>,
    notifier: Arc<dyn Notifier>,
    events: EventPublisher,
}

impl InstanceService {
    pub fn new(
        playbooks: Arc<PlaybookCatalog>,
        repository: Arc<dyn InstanceRepository>,
        notifier: Arc<dyn Notifier>,
        events: EventPublisher,
    ) -> Self {
        Self {
            playbooks,
            repository,
            notifier,
            events,
        }
    }

    /// Create an instance.
    ///
    /// Every var the playbook declares is present on the result, defaulting
    /// to an empty string. Vars the playbook does not declare are rejected.
    /// An existing record is replaced unless it is being deployed or
    /// destroyed.
    #[instrument(skip(self, instance), fields(instance = %instance.key()))]
    pub async fn create(&self, mut instance: Instance) -> Result<Instance> {
        validate_instance_id(&instance.id)?;
        let playbook = self.playbook(&instance.playbook_id)?;

        instance.vars = declared_vars(&playbook, &instance.vars)?;
        instance.set_status(InstanceStatus::New);
        instance.created_at = instance.updated_at;

        match self.repository.save_unless_in_progress(&instance).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict { key, actual }) => {
                return Err(DeploymentError::ConflictingOperation {
                    key,
                    status: actual,
                })
            }
            Err(e) => return Err(e.into()),
        }
        self.events.publish(&instance, InstanceEvent::Created);
        info!("Instance created");

        let mut message = Message::text(format!(
            "New instance was created: {} {}.",
            instance.playbook_id, instance.id
        ));
        if let Some(template) = playbook.message("created") {
            let text = marquee_template::render("created", template, &instance.template_vars())?;
            message = message.with_attachment(Attachment::text(text).with_color("good"));
        }
        self.notifier.send(&message).await?;

        Ok(instance)
    }

    /// Replace an instance's vars. Status and timestamps are kept.
    #[instrument(skip(self, instance), fields(instance = %instance.key()))]
    pub async fn update(&self, instance: Instance) -> Result<Instance> {
        let playbook = self.playbook(&instance.playbook_id)?;
        let mut stored = self
            .repository
            .find_by_id(&instance.playbook_id, &instance.id)
            .await?;

        stored.vars = declared_vars(&playbook, &instance.vars)?;
        stored.updated_at = chrono::Utc::now();

        self.repository.save(&stored).await?;
        self.events.publish(&stored, InstanceEvent::Updated);
        Ok(stored)
    }

    pub async fn show(&self, playbook_id: &str, id: &str) -> Result<Instance> {
        Ok(self.repository.find_by_id(playbook_id, id).await?)
    }

    pub async fn all_with_playbook_id(&self, playbook_id: &str) -> Result<Vec<Instance>> {
        Ok(self.repository.find_by_playbook_id(playbook_id).await?)
    }

    /// Remove an instance record. Cluster objects are left alone; destroy
    /// the instance first to remove them.
    #[instrument(skip(self))]
    pub async fn delete(&self, playbook_id: &str, id: &str) -> Result<()> {
        let instance = self.show(playbook_id, id).await?;
        self.repository.delete(&instance.key()).await?;
        self.events.publish(&instance, InstanceEvent::Deleted);
        info!("Instance deleted");
        Ok(())
    }

    fn playbook(&self, playbook_id: &str) -> Result<Arc<Playbook>> {
        self.playbooks
            .lookup(playbook_id)
            .ok_or_else(|| DeploymentError::PlaybookNotFound(playbook_id.to_string()))
    }
}

/// All vars a playbook declares, overlaid with the given values. Declared
/// vars that are not given default to an empty string; undeclared ones are
/// rejected with `InvalidVar`.
pub fn declared_vars(playbook: &Playbook, given: &Vars) -> Result<Vars> {
    let mut vars: Vars = playbook
        .vars
        .iter()
        .map(|var| (var.clone(), String::new()))
        .collect();

    for (key, value) in given {
        if !playbook.declares_var(key) {
            return Err(DeploymentError::InvalidVar {
                playbook_id: playbook.id.clone(),
                var: key.clone(),
            });
        }
        vars.insert(key.clone(), value.clone());
    }
    Ok(vars)
}
