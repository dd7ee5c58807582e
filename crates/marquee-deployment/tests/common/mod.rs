//! Shared fixtures for deployment tests

#![allow(dead_code)]

use async_trait::async_trait;
use marquee_cluster::InMemoryCluster;
use marquee_deployment::{DeploymentConfig, DeploymentManager, EventPublisher, InstanceService};
use marquee_notify::RecordingNotifier;
use marquee_registry::{
    InMemoryInstanceRepository, InstanceRepository, ManifestSet, PlaybookCatalog, RepositoryError,
};
use marquee_template::Manifest;
use marquee_types::{Instance, InstanceKey, InstanceStatus, Playbook, Task};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MIGRATE: &str = "apiVersion: v1
kind: Pod
metadata:
  name: migrate-{{ .id }}
spec:
  restartPolicy: Never
  containers:
    - name: migrate
      image: web:{{ .branch }}
";

pub const DEPLOYMENT: &str = "apiVersion: apps/v1
kind: Deployment
metadata:
  name: web-{{ .id }}
  labels:
    branch: \"{{ .branch }}\"
spec:
  replicas: {{ .replicas | default \"1\" }}
";

pub const SERVICE: &str = "apiVersion: v1
kind: Service
metadata:
  name: web-{{ .id }}
";

pub const CONFIG: &str = "apiVersion: v1
kind: ConfigMap
metadata:
  name: web-{{ .id }}-config
data:
  branch: \"{{ .branch }}\"
";

pub fn web_playbook() -> Playbook {
    let mut messages = HashMap::new();
    messages.insert(
        "created".to_string(),
        "{{ .id }} is tracking {{ .branch }}".to_string(),
    );
    messages.insert("deleted".to_string(), "{{ .id }} is gone".to_string());

    Playbook {
        id: "web".into(),
        name: "Web frontend".into(),
        meta: Default::default(),
        vars: vec!["branch".into(), "replicas".into()],
        tasks: vec![
            Task::run_pod("Migrate", "migrate"),
            Task::apply("Deploy", vec!["deployment".into(), "service".into()]),
        ],
        messages,
    }
}

pub fn apply_playbook() -> Playbook {
    Playbook {
        id: "static".into(),
        name: "Static site".into(),
        meta: Default::default(),
        vars: vec!["branch".into(), "replicas".into()],
        tasks: vec![
            Task::apply("Config", vec!["config".into()]),
            Task::apply("Deploy", vec!["deployment".into(), "service".into()]),
        ],
        messages: HashMap::new(),
    }
}

/// Only runs the migration pod, so it can be deployed again and again
pub fn job_playbook() -> Playbook {
    Playbook {
        id: "job".into(),
        name: "Migration job".into(),
        meta: Default::default(),
        vars: vec!["branch".into()],
        tasks: vec![Task::run_pod("Migrate", "migrate")],
        messages: HashMap::new(),
    }
}

pub fn manifests() -> ManifestSet {
    ManifestSet::from_manifests(vec![
        Manifest::new("migrate", MIGRATE).unwrap(),
        Manifest::new("deployment", DEPLOYMENT).unwrap(),
        Manifest::new("service", SERVICE).unwrap(),
        Manifest::new("config", CONFIG).unwrap(),
    ])
    .unwrap()
}

/// Repository that can be told to fail writes of particular statuses
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryInstanceRepository,
    failing: Mutex<Vec<InstanceStatus>>,
}

impl FlakyRepository {
    pub fn fail_saving(&self, status: InstanceStatus) {
        self.failing.lock().unwrap().push(status);
    }

    fn check(&self, instance: &Instance) -> Result<(), RepositoryError> {
        if self.failing.lock().unwrap().contains(&instance.status) {
            return Err(RepositoryError::Storage(format!(
                "disk full saving {}",
                instance.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl InstanceRepository for FlakyRepository {
    async fn save(&self, instance: &Instance) -> Result<(), RepositoryError> {
        self.check(instance)?;
        self.inner.save(instance).await
    }

    async fn save_unless_in_progress(&self, instance: &Instance) -> Result<(), RepositoryError> {
        self.check(instance)?;
        self.inner.save_unless_in_progress(instance).await
    }

    async fn find_by_id(&self, playbook_id: &str, id: &str) -> Result<Instance, RepositoryError> {
        self.inner.find_by_id(playbook_id, id).await
    }

    async fn find_by_playbook_id(
        &self,
        playbook_id: &str,
    ) -> Result<Vec<Instance>, RepositoryError> {
        self.inner.find_by_playbook_id(playbook_id).await
    }

    async fn delete(&self, key: &InstanceKey) -> Result<(), RepositoryError> {
        self.inner.delete(key).await
    }
}

pub struct Harness {
    pub cluster: Arc<InMemoryCluster>,
    pub repository: Arc<FlakyRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub manager: DeploymentManager,
    pub instances: InstanceService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(DeploymentConfig {
            namespace: "test".into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: DeploymentConfig) -> Self {
        let catalog =
            PlaybookCatalog::from_playbooks(vec![web_playbook(), apply_playbook(), job_playbook()]);
        let playbooks = Arc::new(catalog.unwrap());
        let manifests = Arc::new(manifests());
        let cluster = Arc::new(InMemoryCluster::new());
        let repository = Arc::new(FlakyRepository::default());
        let notifier = Arc::new(RecordingNotifier::new());
        let events = EventPublisher::new();

        let manager = DeploymentManager::new(
            playbooks.clone(),
            manifests,
            repository.clone(),
            cluster.clone(),
            notifier.clone(),
            config,
        )
        .with_events(events.clone());
        let instances =
            InstanceService::new(playbooks, repository.clone(), notifier.clone(), events);

        Self {
            cluster,
            repository,
            notifier,
            manager,
            instances,
        }
    }

    /// Create a stored instance of the web playbook
    pub async fn web_instance(&self, id: &str) -> Instance {
        self.instances
            .create(Instance::new("web", id).with_var("branch", "main"))
            .await
            .unwrap()
    }

    pub async fn stored_status(&self, playbook_id: &str, id: &str) -> InstanceStatus {
        self.repository
            .find_by_id(playbook_id, id)
            .await
            .unwrap()
            .status
    }
}
