//! Service wiring for marqueed commands

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use marquee_cluster::ClusterClient;
use marquee_deployment::{
    declared_vars, render_manifests, DeploymentError, DeploymentManager, ErrorClass, EventPublisher,
    InstanceService, RenderedManifest,
};
use marquee_notify::{LogNotifier, Notifier, WebhookNotifier};
use marquee_registry::{InMemoryInstanceRepository, InstanceRepository, ManifestSet, PlaybookCatalog};
use marquee_types::{Instance, Vars};
use std::sync::Arc;
use tracing::{info, instrument};

/// Loaded catalogs plus the services built on them
pub struct App {
    playbooks: Arc<PlaybookCatalog>,
    manifests: Arc<ManifestSet>,
    manager: DeploymentManager,
    instances: InstanceService,
}

impl App {
    /// Load playbooks and manifests, then build the services
    pub fn build(config: &DaemonConfig, cluster: Arc<dyn ClusterClient>) -> DaemonResult<Self> {
        let (playbooks, manifests) = marquee_registry::load(
            &config.catalog.playbook_dir,
            &config.catalog.manifest_dir,
        )?;

        let notifier: Arc<dyn Notifier> = match &config.notification.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.notification.timeout())?),
            None => Arc::new(LogNotifier),
        };

        Ok(Self::with_services(
            Arc::new(playbooks),
            Arc::new(manifests),
            Arc::new(InMemoryInstanceRepository::new()),
            cluster,
            notifier,
            config,
        ))
    }

    pub fn with_services(
        playbooks: Arc<PlaybookCatalog>,
        manifests: Arc<ManifestSet>,
        repository: Arc<dyn InstanceRepository>,
        cluster: Arc<dyn ClusterClient>,
        notifier: Arc<dyn Notifier>,
        config: &DaemonConfig,
    ) -> Self {
        let events = EventPublisher::new();
        let manager = DeploymentManager::new(
            playbooks.clone(),
            manifests.clone(),
            repository.clone(),
            cluster,
            notifier.clone(),
            config.deployment.clone(),
        )
        .with_events(events.clone());
        let instances = InstanceService::new(playbooks.clone(), repository, notifier, events);

        Self {
            playbooks,
            manifests,
            manager,
            instances,
        }
    }

    pub fn playbooks(&self) -> &PlaybookCatalog {
        &self.playbooks
    }

    pub fn manifests(&self) -> &ManifestSet {
        &self.manifests
    }

    pub fn manager(&self) -> &DeploymentManager {
        &self.manager
    }

    pub fn instances(&self) -> &InstanceService {
        &self.instances
    }

    /// Render a playbook's manifests for an instance without touching the
    /// cluster. Vars are filled in the same way `deploy` fills them.
    pub fn render(
        &self,
        playbook_id: &str,
        id: &str,
        vars: Vars,
    ) -> DaemonResult<Vec<RenderedManifest>> {
        let playbook = self
            .playbooks
            .lookup(playbook_id)
            .ok_or_else(|| DeploymentError::PlaybookNotFound(playbook_id.to_string()))?;

        let mut instance = Instance::new(playbook_id, id);
        instance.vars = declared_vars(&playbook, &vars)?;
        Ok(render_manifests(&playbook, &instance.template_vars(), &self.manifests)?)
    }

    /// Create the instance, or update its vars if it exists, then deploy it
    #[instrument(skip(self, vars))]
    pub async fn deploy(&self, playbook_id: &str, id: &str, vars: Vars) -> DaemonResult<Instance> {
        let mut instance = self.upsert(playbook_id, id, vars).await?;
        self.manager.deploy(&mut instance).await?;
        info!(status = %instance.status, "Deploy finished");
        Ok(instance)
    }

    /// Destroy the instance's cluster objects
    #[instrument(skip(self, vars))]
    pub async fn destroy(&self, playbook_id: &str, id: &str, vars: Vars) -> DaemonResult<Instance> {
        let mut instance = self.upsert(playbook_id, id, vars).await?;
        self.manager.destroy(&mut instance).await?;
        info!(status = %instance.status, "Destroy finished");
        Ok(instance)
    }

    async fn upsert(&self, playbook_id: &str, id: &str, vars: Vars) -> DaemonResult<Instance> {
        let mut instance = Instance::new(playbook_id, id);
        instance.vars = vars;

        match self.instances.show(playbook_id, id).await {
            Ok(_) => Ok(self.instances.update(instance).await?),
            Err(e) if e.class() == ErrorClass::NotFound => {
                Ok(self.instances.create(instance).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse `key=value` pairs; later pairs win
pub fn parse_vars<I, S>(pairs: I) -> DaemonResult<Vars>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = Vars::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            DaemonError::InvalidArgument(format!("expected key=value, got {:?}", pair))
        })?;
        if key.is_empty() {
            return Err(DaemonError::InvalidArgument(format!("empty key in {:?}", pair)));
        }
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
