//! Instance types
//!
//! An Instance is one concrete, stateful deployment of a Playbook.

use crate::ids::InstanceKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Variable mapping handed to templates
pub type Vars = BTreeMap<String, String>;

/// Instance lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Created but never deployed
    #[default]
    New,
    /// A deploy is in progress
    Deploying,
    /// Last deploy succeeded
    Deployed,
    /// A destroy is in progress
    Deleting,
    /// Last destroy succeeded
    Deleted,
    /// Last deploy or destroy failed
    Error,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::New => "new",
            InstanceStatus::Deploying => "deploying",
            InstanceStatus::Deployed => "deployed",
            InstanceStatus::Deleting => "deleting",
            InstanceStatus::Deleted => "deleted",
            InstanceStatus::Error => "error",
        }
    }

    /// A deploy or destroy currently owns the instance
    pub fn is_in_progress(&self) -> bool {
        matches!(self, InstanceStatus::Deploying | InstanceStatus::Deleting)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment of a playbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Owning playbook
    pub playbook_id: String,

    /// Instance identifier, unique within the playbook
    pub id: String,

    /// Values for the playbook's declared vars
    #[serde(default)]
    pub vars: Vars,

    /// Current status
    #[serde(default)]
    pub status: InstanceStatus,

    /// Creation timestamp
    #[serde(default = "chrono::Utc::now")]
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last modification timestamp
    #[serde(default = "chrono::Utc::now")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Instance {
    pub fn new(playbook_id: impl Into<String>, id: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            playbook_id: playbook_id.into(),
            id: id.into(),
            vars: Vars::new(),
            status: InstanceStatus::New,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(self.playbook_id.clone(), self.id.clone())
    }

    /// Move to a new status and bump `updated_at`
    pub fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
        self.updated_at = chrono::Utc::now();
    }

    /// Variables visible to manifest and message templates.
    ///
    /// The instance vars plus `playbook_id`, `instance_id`, `id` and
    /// `instance_status`; the synthetic entries shadow user vars.
    pub fn template_vars(&self) -> Vars {
        let mut vars = self.vars.clone();
        vars.insert("playbook_id".into(), self.playbook_id.clone());
        vars.insert("instance_id".into(), self.id.clone());
        vars.insert("id".into(), self.id.clone());
        vars.insert("instance_status".into(), self.status.to_string());
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&InstanceStatus::Deploying).unwrap();
        assert_eq!(json, "\"deploying\"");
        let parsed: InstanceStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, InstanceStatus::Error);
    }

    #[test]
    fn test_in_progress() {
        assert!(InstanceStatus::Deploying.is_in_progress());
        assert!(InstanceStatus::Deleting.is_in_progress());
        assert!(!InstanceStatus::Deployed.is_in_progress());
        assert!(!InstanceStatus::New.is_in_progress());
    }

    #[test]
    fn test_template_vars_include_synthetic() {
        let instance = Instance::new("hello", "pr-1")
            .with_var("version", "1.2.3")
            .with_var("id", "shadowed")
            .with_status(InstanceStatus::Deployed);

        let vars = instance.template_vars();
        assert_eq!(vars["version"], "1.2.3");
        assert_eq!(vars["playbook_id"], "hello");
        assert_eq!(vars["instance_id"], "pr-1");
        assert_eq!(vars["id"], "pr-1");
        assert_eq!(vars["instance_status"], "deployed");
        // source vars untouched
        assert_eq!(instance.vars["id"], "shadowed");
    }

    #[test]
    fn test_instance_deserializes_with_defaults() {
        let instance: Instance =
            serde_json::from_str(r#"{"playbook_id":"hello","id":"a"}"#).unwrap();
        assert_eq!(instance.status, InstanceStatus::New);
        assert!(instance.vars.is_empty());
    }
}
