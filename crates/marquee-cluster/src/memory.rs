//! In-memory cluster
//!
//! Stores objects per namespace, records every call in order and replays
//! scripted watch events. Suitable for tests and dry runs.

use crate::client::{ClusterClient, WatchEvent, WatchStream};
use crate::error::{ClusterError, Result};
use crate::object::{ClusterObject, ObjectRef, ResourceKind};
use crate::pod::{PodPhase, POD_API_VERSION, POD_KIND};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// Kind of cluster call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Create,
    Get,
    Delete,
    Watch,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Create => "create",
            Verb::Get => "get",
            Verb::Delete => "delete",
            Verb::Watch => "watch",
        };
        f.write_str(s)
    }
}

/// A recorded cluster call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAction {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

impl ClusterAction {
    pub fn new(verb: Verb, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            verb,
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Events replayed to a watch on a named object
#[derive(Debug, Clone, Default)]
pub struct WatchScript {
    pub events: Vec<Result<WatchEvent>>,
    /// Keep the stream open after the last event instead of ending it
    pub hang: bool,
}

impl WatchScript {
    /// Pod moves through the given phases
    pub fn phases(name: &str, phases: &[PodPhase]) -> Self {
        Self {
            events: phases
                .iter()
                .map(|phase| Ok(WatchEvent::Modified(InMemoryCluster::pod_payload(name, *phase))))
                .collect(),
            hang: false,
        }
    }

    pub fn event(mut self, event: Result<WatchEvent>) -> Self {
        self.events.push(event);
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

type ObjectKey = (String, String, String);

/// In-memory cluster
pub struct InMemoryCluster {
    objects: DashMap<ObjectKey, Value>,
    actions: Mutex<Vec<ClusterAction>>,
    scripts: DashMap<String, WatchScript>,
    failures: DashMap<Verb, ClusterError>,
    open_watches: Arc<AtomicUsize>,
    /// Gets a deleted object stays visible for
    deletion_grace: AtomicUsize,
    /// Deleted objects still visible, with the gets they have left
    terminating: DashMap<ObjectKey, usize>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            actions: Mutex::new(Vec::new()),
            scripts: DashMap::new(),
            failures: DashMap::new(),
            open_watches: Arc::new(AtomicUsize::new(0)),
            deletion_grace: AtomicUsize::new(0),
            terminating: DashMap::new(),
        }
    }

    /// Store an object without recording a call
    pub fn insert(&self, namespace: &str, object: &ClusterObject) {
        self.objects
            .insert(key(namespace, object.reference()), object.body().clone());
    }

    pub fn contains(&self, namespace: &str, object: &ObjectRef) -> bool {
        self.objects.contains_key(&key(namespace, object))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Script the events a watch on `name` will see
    pub fn script_watch(&self, name: impl Into<String>, script: WatchScript) {
        self.scripts.insert(name.into(), script);
    }

    /// Keep deleted objects around, terminating, for the next `gets` get
    /// calls on them, the way graceful deletion does on a real API server.
    /// Creating an object of the same name fails with `AlreadyExists` until
    /// it is gone.
    pub fn keep_deleted_for(&self, gets: usize) {
        self.deletion_grace.store(gets, Ordering::SeqCst);
    }

    /// Make every call of a verb fail with `error`
    pub fn fail_on(&self, verb: Verb, error: ClusterError) {
        self.failures.insert(verb, error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Calls made so far, in order
    pub async fn actions(&self) -> Vec<ClusterAction> {
        self.actions.lock().await.clone()
    }

    /// Calls made so far with the given verb
    pub async fn actions_with(&self, verb: Verb) -> Vec<ClusterAction> {
        self.actions
            .lock()
            .await
            .iter()
            .filter(|a| a.verb == verb)
            .cloned()
            .collect()
    }

    /// Watches that have been opened and not yet dropped
    pub fn open_watches(&self) -> usize {
        self.open_watches.load(Ordering::SeqCst)
    }

    /// A `v1` Pod payload in the given phase
    pub fn pod_payload(name: &str, phase: PodPhase) -> Value {
        json!({
            "apiVersion": POD_API_VERSION,
            "kind": POD_KIND,
            "metadata": { "name": name },
            "status": { "phase": phase.as_str() }
        })
    }

    async fn record(&self, verb: Verb, kind: &str, name: &str) -> Result<()> {
        self.actions
            .lock()
            .await
            .push(ClusterAction::new(verb, kind, name));

        match self.failures.get(&verb) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn key(namespace: &str, object: &ObjectRef) -> ObjectKey {
    (
        namespace.to_string(),
        object.kind().to_string(),
        object.name.clone(),
    )
}

fn name_from_selector(field_selector: &str) -> &str {
    field_selector
        .strip_prefix("metadata.name=")
        .unwrap_or(field_selector)
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn create(&self, namespace: &str, object: &ClusterObject) -> Result<()> {
        self.record(Verb::Create, object.kind(), object.name()).await?;

        let key = key(namespace, object.reference());
        if self.objects.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: object.kind().to_string(),
                name: object.name().to_string(),
            });
        }
        self.objects.insert(key, object.body().clone());
        Ok(())
    }

    async fn get(&self, namespace: &str, object: &ObjectRef) -> Result<Option<Value>> {
        self.record(Verb::Get, object.kind(), &object.name).await?;

        let key = key(namespace, object);
        let expired = match self.terminating.get_mut(&key) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.terminating.remove(&key);
            self.objects.remove(&key);
        }

        Ok(self.objects.get(&key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, namespace: &str, object: &ObjectRef) -> Result<()> {
        self.record(Verb::Delete, object.kind(), &object.name).await?;

        let key = key(namespace, object);
        if !self.objects.contains_key(&key) {
            return Err(ClusterError::NotFound {
                kind: object.kind().to_string(),
                name: object.name.clone(),
            });
        }

        let grace = self.deletion_grace.load(Ordering::SeqCst);
        if grace == 0 {
            self.objects.remove(&key);
        } else {
            self.terminating.entry(key).or_insert(grace);
        }
        Ok(())
    }

    async fn watch(
        &self,
        _namespace: &str,
        resource: &ResourceKind,
        field_selector: &str,
    ) -> Result<WatchStream> {
        let name = name_from_selector(field_selector);
        self.record(Verb::Watch, &resource.kind, name).await?;

        let script = self
            .scripts
            .get(name)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| {
                WatchScript::phases(name, &[PodPhase::Pending, PodPhase::Succeeded])
            });

        let events = stream::iter(script.events);
        let inner = if script.hang {
            events.chain(stream::pending()).boxed()
        } else {
            events.boxed()
        };

        self.open_watches.fetch_add(1, Ordering::SeqCst);
        Ok(TrackedWatch {
            inner,
            open: Arc::clone(&self.open_watches),
        }
        .boxed())
    }
}

/// Watch stream that counts itself as open until dropped
struct TrackedWatch {
    inner: WatchStream,
    open: Arc<AtomicUsize>,
}

impl Stream for TrackedWatch {
    type Item = Result<WatchEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedWatch {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::pod_phase;

    fn pod(name: &str) -> ClusterObject {
        ClusterObject::decode(&format!(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: {}\n",
            name
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let cluster = InMemoryCluster::new();
        let obj = pod("job");

        cluster.create("ns", &obj).await.unwrap();
        assert!(cluster.get("ns", obj.reference()).await.unwrap().is_some());
        assert!(cluster.get("other", obj.reference()).await.unwrap().is_none());

        let err = cluster.create("ns", &obj).await.unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyExists { .. }));

        cluster.delete("ns", obj.reference()).await.unwrap();
        let err = cluster.delete("ns", obj.reference()).await.unwrap_err();
        assert!(err.is_not_found());

        let verbs: Vec<Verb> = cluster.actions().await.iter().map(|a| a.verb).collect();
        assert_eq!(
            verbs,
            vec![
                Verb::Create,
                Verb::Get,
                Verb::Get,
                Verb::Create,
                Verb::Delete,
                Verb::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_deleted_object_terminates_over_gets() {
        let cluster = InMemoryCluster::new();
        cluster.keep_deleted_for(2);
        let obj = pod("job");

        cluster.create("ns", &obj).await.unwrap();
        cluster.delete("ns", obj.reference()).await.unwrap();

        // Still terminating: visible, and its name is taken
        assert!(cluster.get("ns", obj.reference()).await.unwrap().is_some());
        let err = cluster.create("ns", &obj).await.unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyExists { .. }));
        // Deleting again does not restart the countdown
        cluster.delete("ns", obj.reference()).await.unwrap();
        assert!(cluster.get("ns", obj.reference()).await.unwrap().is_some());

        assert!(cluster.get("ns", obj.reference()).await.unwrap().is_none());
        assert_eq!(cluster.object_count(), 0);
        cluster.create("ns", &obj).await.unwrap();
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let cluster = InMemoryCluster::new();
        cluster.fail_on(Verb::Create, ClusterError::Api("quota exceeded".into()));

        let err = cluster.create("ns", &pod("job")).await.unwrap_err();
        assert_eq!(err, ClusterError::Api("quota exceeded".into()));
        assert_eq!(cluster.object_count(), 0);
        assert_eq!(cluster.actions_with(Verb::Create).await.len(), 1);
    }

    #[tokio::test]
    async fn test_default_watch_succeeds() {
        let cluster = InMemoryCluster::new();
        let resource = ResourceKind::new("v1", "Pod");

        let mut watch = cluster
            .watch("ns", &resource, "metadata.name=job")
            .await
            .unwrap();
        assert_eq!(cluster.open_watches(), 1);

        let mut phases = Vec::new();
        while let Some(event) = watch.next().await {
            let event = event.unwrap();
            phases.push(pod_phase(event.object().unwrap()).unwrap());
        }
        assert_eq!(phases, vec![PodPhase::Pending, PodPhase::Succeeded]);

        drop(watch);
        assert_eq!(cluster.open_watches(), 0);
        assert_eq!(
            cluster.actions().await,
            vec![ClusterAction::new(Verb::Watch, "Pod", "job")]
        );
    }

    #[tokio::test]
    async fn test_scripted_watch() {
        let cluster = InMemoryCluster::new();
        cluster.script_watch(
            "job",
            WatchScript::phases("job", &[PodPhase::Running])
                .event(Ok(WatchEvent::Error("gone".into()))),
        );

        let watch = cluster
            .watch("ns", &ResourceKind::new("v1", "Pod"), "metadata.name=job")
            .await
            .unwrap();
        let events: Vec<_> = watch.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Ok(WatchEvent::Error("gone".into())));
    }
}
