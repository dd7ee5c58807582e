//! Deployment engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Namespace every object is created in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Seconds a pod step may run before it is abandoned
    #[serde(default = "default_pod_timeout_secs")]
    pub pod_timeout_secs: u64,

    /// Consecutive undecodable watch events tolerated by a pod step
    #[serde(default = "default_max_decode_failures")]
    pub max_decode_failures: u32,

    /// Milliseconds between checks while a replaced pod terminates
    #[serde(default = "default_delete_poll_millis")]
    pub delete_poll_millis: u64,

    /// How status writes are treated when they fail
    #[serde(default)]
    pub persistence: PersistencePolicy,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_pod_timeout_secs() -> u64 {
    600
}

fn default_max_decode_failures() -> u32 {
    5
}

fn default_delete_poll_millis() -> u64 {
    1000
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            pod_timeout_secs: default_pod_timeout_secs(),
            max_decode_failures: default_max_decode_failures(),
            delete_poll_millis: default_delete_poll_millis(),
            persistence: PersistencePolicy::default(),
        }
    }
}

impl DeploymentConfig {
    pub fn pod_run(&self) -> PodRunConfig {
        PodRunConfig {
            timeout: Duration::from_secs(self.pod_timeout_secs),
            max_decode_failures: self.max_decode_failures,
            delete_poll: Duration::from_millis(self.delete_poll_millis),
        }
    }
}

/// Limits for running a pod to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodRunConfig {
    /// Bounds the wait for the pod to finish, and separately the wait for a
    /// replaced pod to disappear
    pub timeout: Duration,
    pub max_decode_failures: u32,
    pub delete_poll: Duration,
}

impl Default for PodRunConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(default_pod_timeout_secs()),
            max_decode_failures: default_max_decode_failures(),
            delete_poll: Duration::from_millis(default_delete_poll_millis()),
        }
    }
}

/// Whether a failed status write aborts the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Log the failure and carry on
    BestEffort,
    /// Return the failure to the caller
    Required,
}

/// Write modes for the in-progress marker (`Deploying`, `Deleting`) and
/// the terminal status (`Deployed`, `Deleted`, `Error`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistencePolicy {
    #[serde(default = "default_in_progress")]
    pub in_progress: WriteMode,
    #[serde(default = "default_terminal")]
    pub terminal: WriteMode,
}

fn default_in_progress() -> WriteMode {
    WriteMode::BestEffort
}

fn default_terminal() -> WriteMode {
    WriteMode::Required
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            in_progress: default_in_progress(),
            terminal: default_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeploymentConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.pod_run().timeout, Duration::from_secs(600));
        assert_eq!(config.pod_run().max_decode_failures, 5);
        assert_eq!(config.pod_run().delete_poll, Duration::from_secs(1));
        assert_eq!(config.persistence.in_progress, WriteMode::BestEffort);
        assert_eq!(config.persistence.terminal, WriteMode::Required);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DeploymentConfig = serde_json::from_str(
            r#"{"namespace": "staging", "persistence": {"in_progress": "required"}}"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.pod_timeout_secs, 600);
        assert_eq!(config.persistence.in_progress, WriteMode::Required);
        assert_eq!(config.persistence.terminal, WriteMode::Required);
    }
}
