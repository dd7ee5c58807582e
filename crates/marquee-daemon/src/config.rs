//! Configuration for marqueed

use marquee_deployment::DeploymentConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Cluster backend
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Where playbooks and manifests are read from
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Namespace, pod timeouts and persistence policy
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Notification delivery
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which cluster the daemon talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterBackend {
    /// Kubernetes, using the in-cluster service account or local kubeconfig
    #[default]
    Kube,
    /// In-process cluster that records calls and runs pods instantly
    Memory,
}

/// Cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub backend: ClusterBackend,
}

/// Catalog locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_playbook_dir")]
    pub playbook_dir: PathBuf,

    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            playbook_dir: default_playbook_dir(),
            manifest_dir: default_manifest_dir(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Chat incoming webhook; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_playbook_dir() -> PathBuf {
    PathBuf::from("playbooks")
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("manifests")
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `MARQUEE_*` environment variables (`MARQUEE_DEPLOYMENT__NAMESPACE`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MARQUEE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.deployment.namespace.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "deployment.namespace must not be empty".into(),
            ));
        }
        if self.deployment.pod_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "deployment.pod_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_deployment::WriteMode;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.cluster.backend, ClusterBackend::Kube);
        assert_eq!(config.catalog.playbook_dir, PathBuf::from("playbooks"));
        assert_eq!(config.deployment.namespace, "default");
        assert!(config.notification.webhook_url.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "cluster:\n  backend: memory\ndeployment:\n  namespace: staging\n  pod_timeout_secs: 30\n  persistence:\n    in_progress: required\nnotification:\n  webhook_url: http://hooks.local/x\n"
        )
        .unwrap();

        let config = DaemonConfig::load(file.path().to_str()).unwrap();

        assert_eq!(config.cluster.backend, ClusterBackend::Memory);
        assert_eq!(config.deployment.namespace, "staging");
        assert_eq!(config.deployment.pod_timeout_secs, 30);
        assert_eq!(config.deployment.max_decode_failures, 5);
        assert_eq!(config.deployment.persistence.in_progress, WriteMode::Required);
        assert_eq!(config.deployment.persistence.terminal, WriteMode::Required);
        assert_eq!(
            config.notification.webhook_url.as_deref(),
            Some("http://hooks.local/x")
        );
        assert_eq!(config.catalog.manifest_dir, PathBuf::from("manifests"));
    }

    #[test]
    fn test_validate_rejects_empty_namespace() {
        let mut config = DaemonConfig::default();
        config.deployment.namespace = " ".into();
        assert!(config.validate().is_err());

        config.deployment.namespace = "default".into();
        config.deployment.pod_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
