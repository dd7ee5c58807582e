//! Cluster client trait

use crate::error::Result;
use crate::object::{ClusterObject, ObjectRef, ResourceKind};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// A change event from a watch. Payloads are raw JSON in whatever
/// representation the control plane chose to send.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(Value),
    Modified(Value),
    Deleted(Value),
    /// Error reported in-band by the control plane
    Error(String),
}

impl WatchEvent {
    /// Object payload, if the event carries one
    pub fn object(&self) -> Option<&Value> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
                Some(obj)
            }
            WatchEvent::Error(_) => None,
        }
    }
}

/// Stream of watch events. Dropping the stream closes the watch.
pub type WatchStream = BoxStream<'static, Result<WatchEvent>>;

/// Access to the cluster control plane
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create an object in a namespace
    async fn create(&self, namespace: &str, object: &ClusterObject) -> Result<()>;

    /// Get an object, `None` if it does not exist
    async fn get(&self, namespace: &str, object: &ObjectRef) -> Result<Option<Value>>;

    /// Delete an object. Fails with `ClusterError::NotFound` if it does not
    /// exist.
    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<()>;

    /// Watch objects of a kind matching a field selector
    async fn watch(
        &self,
        namespace: &str,
        resource: &ResourceKind,
        field_selector: &str,
    ) -> Result<WatchStream>;
}
