//! Deployment Manager - the instance state machine
//!
//! ```text
//! New | Deployed | Deleted | Error --deploy--> Deploying --> Deployed | Error
//! New | Deployed | Deleted | Error --destroy-> Deleting  --> Deleted  | Error
//! ```
//!
//! An instance that is `Deploying` or `Deleting` rejects both operations.
//! The in-progress marker is written with a conditional write, so two callers
//! racing on the same instance cannot both get past the guard.

use crate::builder::build_steps;
use crate::config::{DeploymentConfig, WriteMode};
use crate::context::StepContext;
use crate::error::{DeploymentError, Result};
use crate::events::EventPublisher;
use crate::steps::Step;
use marquee_cluster::ClusterClient;
use marquee_notify::Notifier;
use marquee_registry::{InstanceRepository, ManifestSet, PlaybookCatalog, RepositoryError};
use marquee_types::{
    Attachment, Instance, InstanceEvent, InstanceEventEnvelope, InstanceStatus, Message, Playbook,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

/// Which way an operation goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Deploy,
    Destroy,
}

impl Operation {
    fn in_progress(self) -> InstanceStatus {
        match self {
            Operation::Deploy => InstanceStatus::Deploying,
            Operation::Destroy => InstanceStatus::Deleting,
        }
    }

    fn done(self) -> InstanceStatus {
        match self {
            Operation::Deploy => InstanceStatus::Deployed,
            Operation::Destroy => InstanceStatus::Deleted,
        }
    }

    fn started(self, steps: usize) -> InstanceEvent {
        match self {
            Operation::Deploy => InstanceEvent::DeployStarted { steps },
            Operation::Destroy => InstanceEvent::DestroyStarted { steps },
        }
    }

    fn finished(self) -> InstanceEvent {
        match self {
            Operation::Deploy => InstanceEvent::Deployed,
            Operation::Destroy => InstanceEvent::Destroyed,
        }
    }

    fn failed(self, reason: String) -> InstanceEvent {
        match self {
            Operation::Deploy => InstanceEvent::DeployFailed { reason },
            Operation::Destroy => InstanceEvent::DestroyFailed { reason },
        }
    }
}

/// Deploys and destroys instances
pub struct DeploymentManager {
    /// Playbooks, loaded at startup
    playbooks: Arc<PlaybookCatalog>,
    /// Manifest templates, loaded at startup
    manifests: Arc<ManifestSet>,
    /// Instance persistence
    repository: Arc<dyn InstanceRepository>,
    /// Cluster the steps run against
    cluster: Arc<dyn ClusterClient>,
    /// Completion notifications
    notifier: Arc<dyn Notifier>,
    config: DeploymentConfig,
    events: EventPublisher,
}

impl DeploymentManager {
    pub fn new(
        playbooks: Arc<PlaybookCatalog>,
        manifests: Arc<ManifestSet>,
        repository: Arc<dyn InstanceRepository>,
        cluster: Arc<dyn ClusterClient>,
        notifier: Arc<dyn Notifier>,
        config: DeploymentConfig,
    ) -> Self {
        Self {
            playbooks,
            manifests,
            repository,
            cluster,
            notifier,
            config,
            events: EventPublisher::new(),
        }
    }

    /// Share an event channel with other services
    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Subscribe to instance events
    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEventEnvelope> {
        self.events.subscribe()
    }

    /// Build the steps a deploy or destroy of `instance` would run
    pub fn plan(&self, instance: &Instance) -> Result<Vec<Step>> {
        let playbook = self.playbook(instance)?;
        build_steps(
            &playbook,
            &instance.template_vars(),
            &self.manifests,
            self.config.pod_run(),
        )
    }

    /// Deploy an instance.
    ///
    /// On return the instance carries its final status. If a step fails the
    /// step's error is returned unless recording the `Error` status fails too,
    /// in which case the persistence error is returned instead.
    #[instrument(skip(self, instance), fields(instance = %instance.key()))]
    pub async fn deploy(&self, instance: &mut Instance) -> Result<()> {
        let playbook = self.playbook(instance)?;
        let steps = self.prepare(&playbook, instance)?;

        self.run(Operation::Deploy, &playbook, instance, steps).await?;

        self.notifier
            .send(&Message::text(format!(
                "Instance was deployed: {} {}.",
                instance.playbook_id, instance.id
            )))
            .await?;
        Ok(())
    }

    /// Destroy an instance's cluster objects, in playbook order.
    ///
    /// Objects that are already gone are skipped. The first failure aborts
    /// the remaining steps and leaves the instance in `Error`.
    #[instrument(skip(self, instance), fields(instance = %instance.key()))]
    pub async fn destroy(&self, instance: &mut Instance) -> Result<()> {
        let playbook = self.playbook(instance)?;
        let steps = self.prepare(&playbook, instance)?;

        self.run(Operation::Destroy, &playbook, instance, steps).await?;

        let mut message = Message::text(format!(
            "Instance was destroyed: {} {}.",
            instance.playbook_id, instance.id
        ));
        if let Some(template) = playbook.message("deleted") {
            let text = marquee_template::render("deleted", template, &instance.template_vars())?;
            message = message.with_attachment(Attachment::text(text).with_color("good"));
        }
        self.notifier.send(&message).await?;
        Ok(())
    }

    fn playbook(&self, instance: &Instance) -> Result<Arc<Playbook>> {
        self.playbooks
            .lookup(&instance.playbook_id)
            .ok_or_else(|| DeploymentError::PlaybookNotFound(instance.playbook_id.clone()))
    }

    /// Guard against operations in progress and build the steps. Nothing is
    /// written and no cluster call is made.
    fn prepare(&self, playbook: &Playbook, instance: &Instance) -> Result<Vec<Step>> {
        if instance.status.is_in_progress() {
            return Err(DeploymentError::ConflictingOperation {
                key: instance.key(),
                status: instance.status,
            });
        }

        build_steps(
            playbook,
            &instance.template_vars(),
            &self.manifests,
            self.config.pod_run(),
        )
    }

    async fn run(
        &self,
        op: Operation,
        playbook: &Playbook,
        instance: &mut Instance,
        steps: Vec<Step>,
    ) -> Result<()> {
        self.mark_in_progress(op, instance).await?;
        self.events.publish(instance, op.started(steps.len()));
        info!(playbook_id = %playbook.id, steps = steps.len(), ?op, "Starting");

        let ctx = StepContext::new(self.cluster.clone(), self.config.namespace.clone());
        for step in &steps {
            let result = match op {
                Operation::Deploy => step.deploy(&ctx).await,
                Operation::Destroy => step.destroy(&ctx).await,
            };

            if let Err(e) = result {
                error!(
                    task = step.task(),
                    object = %step.object().reference(),
                    error = %e,
                    ?op,
                    "Step failed"
                );
                instance.set_status(InstanceStatus::Error);
                self.persist_terminal(instance).await?;
                self.events.publish(instance, op.failed(e.to_string()));
                return Err(e);
            }

            self.events.publish(
                instance,
                InstanceEvent::StepCompleted {
                    task: step.task().to_string(),
                    object: step.object().reference().to_string(),
                },
            );
        }

        instance.set_status(op.done());
        self.persist_terminal(instance).await?;
        self.events.publish(instance, op.finished());
        info!(status = %instance.status, "Finished");
        Ok(())
    }

    /// Write `Deploying`/`Deleting` unless another operation already holds
    /// the stored record
    async fn mark_in_progress(&self, op: Operation, instance: &mut Instance) -> Result<()> {
        let previous = instance.clone();
        instance.set_status(op.in_progress());

        match self.repository.save_unless_in_progress(instance).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict { key, actual, .. }) => {
                *instance = previous;
                Err(DeploymentError::ConflictingOperation {
                    key,
                    status: actual,
                })
            }
            Err(e) => match self.config.persistence.in_progress {
                WriteMode::BestEffort => {
                    warn!(status = %instance.status, error = %e, "Failed to save status, continuing");
                    Ok(())
                }
                WriteMode::Required => {
                    *instance = previous;
                    Err(e.into())
                }
            },
        }
    }

    async fn persist_terminal(&self, instance: &Instance) -> Result<()> {
        match self.repository.save(instance).await {
            Ok(()) => Ok(()),
            Err(e) => match self.config.persistence.terminal {
                WriteMode::BestEffort => {
                    warn!(status = %instance.status, error = %e, "Failed to save status");
                    Ok(())
                }
                WriteMode::Required => {
                    error!(status = %instance.status, error = %e, "Failed to save status");
                    Err(e.into())
                }
            },
        }
    }
}
