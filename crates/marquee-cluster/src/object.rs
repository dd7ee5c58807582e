//! Kind-tagged cluster objects decoded from manifest text

use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// API version and kind of a resource, e.g. `apps/v1` `Deployment`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKind {
    pub api_version: String,
    pub kind: String,
}

impl ResourceKind {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// Split `apiVersion` into group and version. Core resources have an
    /// empty group.
    pub fn group_version(&self) -> (&str, &str) {
        self.api_version
            .split_once('/')
            .unwrap_or(("", self.api_version.as_str()))
    }
}

/// Reference to a named object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub resource: ResourceKind,
    pub name: String,
}

impl ObjectRef {
    pub fn new(resource: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            resource,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.resource.kind
    }

    /// Field selector matching exactly this object
    pub fn field_selector(&self) -> String {
        format!("metadata.name={}", self.name)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource.kind, self.name)
    }
}

/// A decoded object ready to be sent to the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterObject {
    reference: ObjectRef,
    body: Value,
}

impl ClusterObject {
    /// Decode YAML or JSON manifest text.
    ///
    /// The document must be a mapping with `apiVersion`, `kind` and
    /// `metadata.name`. Parser messages are passed through unchanged.
    pub fn decode(text: &str) -> Result<Self> {
        let body: Value =
            serde_yaml::from_str(text).map_err(|e| ClusterError::Decode(e.to_string()))?;
        Self::from_value(body)
    }

    /// Build from an already-parsed JSON value
    pub fn from_value(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(ClusterError::Decode(
                "manifest is not a mapping".to_string(),
            ));
        }

        let api_version = required_str(&body, "/apiVersion")?;
        let kind = required_str(&body, "/kind")?;
        let name = required_str(&body, "/metadata/name")?;

        Ok(Self {
            reference: ObjectRef::new(ResourceKind::new(api_version, kind), name),
            body,
        })
    }

    pub fn reference(&self) -> &ObjectRef {
        &self.reference
    }

    pub fn resource(&self) -> &ResourceKind {
        &self.reference.resource
    }

    pub fn api_version(&self) -> &str {
        &self.reference.resource.api_version
    }

    pub fn kind(&self) -> &str {
        &self.reference.resource.kind
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

fn required_str(body: &Value, pointer: &str) -> Result<String> {
    match body.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(ClusterError::Decode(format!(
            "{} must be a non-empty string",
            pointer.trim_start_matches('/').replace('/', ".")
        ))),
        None => Err(ClusterError::Decode(format!(
            "missing field {}",
            pointer.trim_start_matches('/').replace('/', ".")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_yaml() {
        let obj = ClusterObject::decode(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 2\n",
        )
        .unwrap();
        assert_eq!(obj.kind(), "Deployment");
        assert_eq!(obj.name(), "web");
        assert_eq!(obj.resource().group_version(), ("apps", "v1"));
        assert_eq!(obj.body()["spec"]["replicas"], 2);
    }

    #[test]
    fn test_decode_json() {
        let obj = ClusterObject::decode(
            r#"{"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "job"}}"#,
        )
        .unwrap();
        assert_eq!(obj.reference().to_string(), "Pod/job");
        assert_eq!(obj.resource().group_version(), ("", "v1"));
        assert_eq!(obj.reference().field_selector(), "metadata.name=job");
    }

    #[test]
    fn test_decode_missing_fields() {
        let err = ClusterObject::decode("apiVersion: v1\nkind: Pod\n").unwrap_err();
        assert_eq!(err, ClusterError::Decode("missing field metadata.name".into()));

        let err = ClusterObject::decode("kind: Pod\nmetadata:\n  name: x\n").unwrap_err();
        assert!(matches!(err, ClusterError::Decode(ref m) if m.contains("apiVersion")));
    }

    #[test]
    fn test_decode_rejects_non_mapping() {
        assert!(matches!(
            ClusterObject::decode("- a\n- b\n"),
            Err(ClusterError::Decode(_))
        ));
        assert!(matches!(
            ClusterObject::decode("key: [unclosed"),
            Err(ClusterError::Decode(_))
        ));
    }
}
