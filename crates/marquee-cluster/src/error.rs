//! Cluster error types

use thiserror::Error;

/// Errors raised by cluster adapters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Failed to decode object: {0}")]
    Decode(String),

    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("Cluster API error: {0}")]
    Api(String),

    #[error("Watch error: {0}")]
    Watch(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, ClusterError>;
