//! Playbook and task definitions
//!
//! A Playbook is the static template for deploying an instance. It is loaded
//! from disk once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A named, ordered description of what to deploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
    /// Unique playbook identifier
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Ownership metadata
    #[serde(default)]
    pub meta: PlaybookMeta,

    /// Variables an instance may supply
    #[serde(default)]
    pub vars: Vec<String>,

    /// Tasks, executed in order
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Notification templates keyed by event name (e.g. "created")
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

/// Ownership metadata attached to a playbook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookMeta {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub slack: String,
}

/// One ordered unit of work within a playbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,

    /// Manifests applied in order (duplicates allowed)
    #[serde(default)]
    pub manifests: Vec<String>,

    /// A pod manifest run to completion; takes precedence over `manifests`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_manifest: Option<String>,
}

/// What a task does once the pod/manifest precedence rule is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction<'a> {
    /// Run a single pod to completion
    RunPod(&'a str),
    /// Apply each manifest in order
    Apply(&'a [String]),
}

impl Task {
    /// Create a task that applies manifests
    pub fn apply(name: impl Into<String>, manifests: Vec<String>) -> Self {
        Self {
            name: name.into(),
            manifests,
            pod_manifest: None,
        }
    }

    /// Create a task that runs a pod to completion
    pub fn run_pod(name: impl Into<String>, pod_manifest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifests: Vec::new(),
            pod_manifest: Some(pod_manifest.into()),
        }
    }

    /// Resolve the task action. A non-empty `pod_manifest` wins and
    /// `manifests` is ignored.
    pub fn action(&self) -> TaskAction<'_> {
        match self.pod_manifest.as_deref() {
            Some(pod) if !pod.is_empty() => TaskAction::RunPod(pod),
            _ => TaskAction::Apply(&self.manifests),
        }
    }

    /// Manifest names this task will actually use
    pub fn referenced_manifests(&self) -> Vec<&str> {
        match self.action() {
            TaskAction::RunPod(pod) => vec![pod],
            TaskAction::Apply(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Playbook validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybookError {
    #[error("Playbook is missing an id")]
    MissingId,

    #[error("Playbook {0} is missing a name")]
    MissingName(String),

    #[error("Playbook {playbook_id} task #{index} is missing a name")]
    UnnamedTask { playbook_id: String, index: usize },

    #[error("Playbook {playbook_id} task {task} has neither manifests nor a pod manifest")]
    EmptyTask { playbook_id: String, task: String },

    #[error("Playbook {playbook_id} declares var {var} more than once")]
    DuplicateVar { playbook_id: String, var: String },
}

impl Playbook {
    /// Whether an instance of this playbook may set `var`
    pub fn declares_var(&self, var: &str) -> bool {
        self.vars.iter().any(|v| v == var)
    }

    /// Notification template for an event, if the playbook defines one
    pub fn message(&self, event: &str) -> Option<&str> {
        self.messages.get(event).map(String::as_str)
    }

    /// All manifest names referenced by the playbook's tasks
    pub fn referenced_manifests(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().flat_map(Task::referenced_manifests)
    }

    /// Structural validation, independent of the manifest set
    pub fn validate(&self) -> Result<(), PlaybookError> {
        if self.id.is_empty() {
            return Err(PlaybookError::MissingId);
        }
        if self.name.is_empty() {
            return Err(PlaybookError::MissingName(self.id.clone()));
        }

        for (i, var) in self.vars.iter().enumerate() {
            if self.vars[..i].contains(var) {
                return Err(PlaybookError::DuplicateVar {
                    playbook_id: self.id.clone(),
                    var: var.clone(),
                });
            }
        }

        for (index, task) in self.tasks.iter().enumerate() {
            if task.name.is_empty() {
                return Err(PlaybookError::UnnamedTask {
                    playbook_id: self.id.clone(),
                    index,
                });
            }
            if task.referenced_manifests().is_empty() {
                return Err(PlaybookError::EmptyTask {
                    playbook_id: self.id.clone(),
                    task: task.name.clone(),
                });
            }
        }

        Ok(())
    }
}
