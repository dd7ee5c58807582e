//! Daemon error types

use marquee_cluster::ClusterError;
use marquee_deployment::DeploymentError;
use marquee_notify::NotifyError;
use marquee_registry::RegistryError;
use thiserror::Error;

/// Errors surfaced by the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to load catalog: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Notifier error: {0}")]
    Notify(#[from] NotifyError),
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

pub type DaemonResult<T> = Result<T, DaemonError>;
