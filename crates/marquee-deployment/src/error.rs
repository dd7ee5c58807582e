//! Deployment error types

use marquee_cluster::ClusterError;
use marquee_notify::NotifyError;
use marquee_registry::RepositoryError;
use marquee_template::TemplateError;
use marquee_types::{InstanceKey, InstanceStatus, InvalidInstanceId};
use thiserror::Error;

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Playbook not found: {0}")]
    PlaybookNotFound(String),

    #[error("Playbook {playbook_id} does not declare a var named {var}")]
    InvalidVar { playbook_id: String, var: String },

    #[error(transparent)]
    InvalidId(#[from] InvalidInstanceId),

    #[error("Playbook {playbook_id} task {task} references unknown manifest {manifest}")]
    ManifestNotFound {
        playbook_id: String,
        task: String,
        manifest: String,
    },

    #[error("Manifest {manifest} must be a {expected}, got {actual}")]
    WrongManifestKind {
        manifest: String,
        expected: String,
        actual: String,
    },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to decode manifest {manifest}: {source}")]
    Decode {
        manifest: String,
        #[source]
        source: ClusterError,
    },

    #[error("Setup pod {0} failed")]
    SetupPodFailed(String),

    #[error("State of pod {0} is unknown")]
    PodStateUnknown(String),

    #[error("Instance {key} is {status}; wait for it to finish")]
    ConflictingOperation {
        key: InstanceKey,
        status: InstanceStatus,
    },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Gave up on pod {pod} after {failures} undecodable watch events: {last}")]
    PodDecode {
        pod: String,
        failures: u32,
        last: String,
    },

    #[error("Watch on pod {0} closed before it finished")]
    WatchClosed(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Coarse classification used by front ends to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Invalid,
    Internal,
}

impl DeploymentError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DeploymentError::PlaybookNotFound(_) => ErrorClass::NotFound,
            DeploymentError::Repository(e) if e.is_not_found() => ErrorClass::NotFound,
            DeploymentError::InvalidVar { .. }
            | DeploymentError::InvalidId(_)
            | DeploymentError::ConflictingOperation { .. } => ErrorClass::Invalid,
            _ => ErrorClass::Internal,
        }
    }
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;
