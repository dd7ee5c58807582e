//! Registry error types

use marquee_template::TemplateError;
use marquee_types::{InstanceKey, InstanceStatus, PlaybookError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading playbooks and manifests
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid manifest template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid playbook: {0}")]
    InvalidPlaybook(#[from] PlaybookError),

    #[error("Playbook {0} is defined more than once")]
    DuplicatePlaybook(String),

    #[error("Manifest {0} is defined more than once")]
    DuplicateManifest(String),

    #[error("Playbook {playbook_id} task {task} references unknown manifest {manifest}")]
    UnknownManifest {
        playbook_id: String,
        task: String,
        manifest: String,
    },
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised by instance repositories
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Instance not found: {0}")]
    NotFound(InstanceKey),

    #[error("Instance {key} is {actual}")]
    Conflict {
        key: InstanceKey,
        actual: InstanceStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}
