//! Kubernetes client backed by `kube`'s dynamic object API

use crate::client::{ClusterClient, WatchEvent, WatchStream};
use crate::error::{ClusterError, Result};
use crate::object::{ClusterObject, ObjectRef, ResourceKind};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams, WatchParams,
};
use kube::Client;
use serde_json::Value;
use tracing::debug;

/// Cluster client talking to a Kubernetes API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the in-cluster service account or the local kubeconfig
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Api(format!("failed to create client: {}", e)))?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str, resource: &ResourceKind) -> Api<DynamicObject> {
        let (group, version) = resource.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &resource.kind);
        Api::namespaced_with(self.client.clone(), namespace, &ApiResource::from_gvk(&gvk))
    }
}

fn map_error(err: kube::Error, object: Option<&ObjectRef>) -> ClusterError {
    match (&err, object) {
        (kube::Error::Api(response), Some(object)) if response.code == 404 => {
            ClusterError::NotFound {
                kind: object.kind().to_string(),
                name: object.name.clone(),
            }
        }
        (kube::Error::Api(response), Some(object)) if response.code == 409 => {
            ClusterError::AlreadyExists {
                kind: object.kind().to_string(),
                name: object.name.clone(),
            }
        }
        _ => ClusterError::Api(err.to_string()),
    }
}

fn to_value(object: DynamicObject) -> Result<Value> {
    serde_json::to_value(object).map_err(|e| ClusterError::Decode(e.to_string()))
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create(&self, namespace: &str, object: &ClusterObject) -> Result<()> {
        let dynamic: DynamicObject = serde_json::from_value(object.body().clone())
            .map_err(|e| ClusterError::Decode(e.to_string()))?;

        self.api(namespace, object.resource())
            .create(&PostParams::default(), &dynamic)
            .await
            .map_err(|e| map_error(e, Some(object.reference())))?;

        debug!(namespace, object = %object.reference(), "Created object");
        Ok(())
    }

    async fn get(&self, namespace: &str, object: &ObjectRef) -> Result<Option<Value>> {
        let found = self
            .api(namespace, &object.resource)
            .get_opt(&object.name)
            .await
            .map_err(|e| map_error(e, Some(object)))?;
        found.map(to_value).transpose()
    }

    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<()> {
        self.api(namespace, &object.resource)
            .delete(&object.name, &DeleteParams::default())
            .await
            .map_err(|e| map_error(e, Some(object)))?;

        debug!(namespace, object = %object, "Deleted object");
        Ok(())
    }

    async fn watch(
        &self,
        namespace: &str,
        resource: &ResourceKind,
        field_selector: &str,
    ) -> Result<WatchStream> {
        let params = WatchParams::default().fields(field_selector);
        let stream = self
            .api(namespace, resource)
            .watch(&params, "0")
            .await
            .map_err(|e| map_error(e, None))?;

        let events = stream
            .map_err(|e| ClusterError::Watch(e.to_string()))
            .try_filter_map(|event| async move {
                Ok(match event {
                    kube::api::WatchEvent::Added(obj) => Some(WatchEvent::Added(to_value(obj)?)),
                    kube::api::WatchEvent::Modified(obj) => {
                        Some(WatchEvent::Modified(to_value(obj)?))
                    }
                    kube::api::WatchEvent::Deleted(obj) => {
                        Some(WatchEvent::Deleted(to_value(obj)?))
                    }
                    kube::api::WatchEvent::Bookmark(_) => None,
                    kube::api::WatchEvent::Error(response) => {
                        Some(WatchEvent::Error(response.message))
                    }
                })
            });

        Ok(events.boxed())
    }
}
