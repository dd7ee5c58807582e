//! Run-to-completion pod step
//!
//! A bare pod has no notion of "run once and report". This step provides it:
//!
//! ```text
//! Absent -> Creating -> Running -> { Succeeded, Failed, Unknown }
//! ```
//!
//! Deploy replaces any previous pod of the same name, waiting for it to
//! finish terminating, creates the new one and watches it until it leaves
//! `Pending`/`Running`. A succeeded pod is
//! deleted; a failed or unknown one is left for inspection.

use super::StepExecutor;
use crate::config::PodRunConfig;
use crate::context::StepContext;
use crate::error::{DeploymentError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use marquee_cluster::{pod_phase, ClusterObject, PodPhase, WatchEvent, WatchStream, POD_KIND};
use tracing::{debug, info, warn};

/// Runs a pod to completion
#[derive(Debug, Clone)]
pub struct PodManifestStep {
    object: ClusterObject,
    config: PodRunConfig,
}

impl PodManifestStep {
    /// Fails with `WrongManifestKind` unless the object is a pod
    pub fn new(manifest: &str, object: ClusterObject, config: PodRunConfig) -> Result<Self> {
        if object.kind() != POD_KIND {
            return Err(DeploymentError::WrongManifestKind {
                manifest: manifest.to_string(),
                expected: POD_KIND.to_string(),
                actual: object.kind().to_string(),
            });
        }
        Ok(Self { object, config })
    }

    fn name(&self) -> &str {
        self.object.name()
    }

    /// Delete the pod, treating an absent pod as deleted
    async fn delete_pod(&self, ctx: &StepContext) -> Result<()> {
        match ctx.cluster.delete(&ctx.namespace, self.object.reference()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(pod = self.name(), "Pod already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Poll until the pod no longer exists. Graceful deletion leaves it in
    /// place, terminating, after the delete call returns.
    async fn wait_until_gone(&self, ctx: &StepContext) -> Result<()> {
        let pod = self.object.reference();
        let poll = async {
            while ctx.cluster.get(&ctx.namespace, pod).await?.is_some() {
                debug!(pod = self.name(), "Previous pod still terminating");
                tokio::time::sleep(self.config.delete_poll).await;
            }
            Ok::<(), DeploymentError>(())
        };

        tokio::time::timeout(self.config.timeout, poll)
            .await
            .map_err(|_| DeploymentError::Timeout {
                operation: format!("previous pod {} to terminate", self.name()),
            })?
    }

    /// Consume watch events until the pod leaves an active phase. The watch
    /// is dropped, and so closed, on every return.
    async fn wait_for_completion(&self, mut watch: WatchStream) -> Result<PodPhase> {
        let mut failures = 0u32;

        while let Some(event) = watch.next().await {
            let decoded = match event {
                Ok(WatchEvent::Error(message)) => Err(message),
                Ok(event) => match event.object() {
                    Some(payload) => pod_phase(payload).map_err(|e| e.to_string()),
                    None => Err("event without an object".to_string()),
                },
                Err(e) => Err(e.to_string()),
            };

            match decoded {
                Ok(phase) if phase.is_active() => {
                    failures = 0;
                    debug!(pod = self.name(), %phase, "Pod still active");
                }
                Ok(phase) => return Ok(phase),
                Err(last) => {
                    failures += 1;
                    warn!(pod = self.name(), failures, error = %last, "Could not read pod phase");
                    if failures > self.config.max_decode_failures {
                        return Err(DeploymentError::PodDecode {
                            pod: self.name().to_string(),
                            failures,
                            last,
                        });
                    }
                }
            }
        }

        Err(DeploymentError::WatchClosed(self.name().to_string()))
    }
}

#[async_trait]
impl StepExecutor for PodManifestStep {
    async fn deploy(&self, ctx: &StepContext) -> Result<()> {
        let pod = self.object.reference();

        if ctx.cluster.get(&ctx.namespace, pod).await?.is_some() {
            info!(pod = self.name(), "Deleting previous pod");
            self.delete_pod(ctx).await?;
            self.wait_until_gone(ctx).await?;
        }

        info!(pod = self.name(), namespace = %ctx.namespace, "Creating pod");
        ctx.cluster.create(&ctx.namespace, &self.object).await?;

        let watch = ctx
            .cluster
            .watch(&ctx.namespace, self.object.resource(), &pod.field_selector())
            .await?;

        let phase = tokio::time::timeout(self.config.timeout, self.wait_for_completion(watch))
            .await
            .map_err(|_| DeploymentError::Timeout {
                operation: format!("pod {} to finish", self.name()),
            })??;

        info!(pod = self.name(), %phase, "Pod finished");
        match phase {
            PodPhase::Failed => Err(DeploymentError::SetupPodFailed(self.name().to_string())),
            PodPhase::Unknown => Err(DeploymentError::PodStateUnknown(self.name().to_string())),
            _ => self.delete_pod(ctx).await,
        }
    }

    async fn destroy(&self, ctx: &StepContext) -> Result<()> {
        self.delete_pod(ctx).await
    }

    fn object(&self) -> &ClusterObject {
        &self.object
    }

    fn kind(&self) -> &'static str {
        "pod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_cluster::{ClusterAction, ClusterError, InMemoryCluster, Verb, WatchScript};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn pod() -> ClusterObject {
        ClusterObject::decode("apiVersion: v1\nkind: Pod\nmetadata:\n  name: migrate\n").unwrap()
    }

    fn step() -> PodManifestStep {
        PodManifestStep::new("migrate", pod(), PodRunConfig::default()).unwrap()
    }

    fn fast_step(timeout: Duration) -> PodManifestStep {
        let config = PodRunConfig {
            timeout,
            delete_poll: Duration::from_millis(1),
            ..PodRunConfig::default()
        };
        PodManifestStep::new("migrate", pod(), config).unwrap()
    }

    fn setup() -> (Arc<InMemoryCluster>, StepContext) {
        let cluster = Arc::new(InMemoryCluster::new());
        let ctx = StepContext::new(cluster.clone(), "ns");
        (cluster, ctx)
    }

    #[test]
    fn test_rejects_non_pod() {
        let svc =
            ClusterObject::decode("apiVersion: v1\nkind: Service\nmetadata:\n  name: x\n").unwrap();
        let err = PodManifestStep::new("svc", svc, PodRunConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::WrongManifestKind { ref actual, .. } if actual == "Service"
        ));
    }

    #[tokio::test]
    async fn test_succeeded_pod_is_cleaned_up() {
        let (cluster, ctx) = setup();

        step().deploy(&ctx).await.unwrap();

        assert_eq!(
            cluster.actions().await,
            vec![
                ClusterAction::new(Verb::Get, "Pod", "migrate"),
                ClusterAction::new(Verb::Create, "Pod", "migrate"),
                ClusterAction::new(Verb::Watch, "Pod", "migrate"),
                ClusterAction::new(Verb::Delete, "Pod", "migrate"),
            ]
        );
        assert!(!cluster.contains("ns", pod().reference()));
        assert_eq!(cluster.open_watches(), 0);
    }

    #[tokio::test]
    async fn test_previous_pod_is_replaced() {
        let (cluster, ctx) = setup();
        cluster.insert("ns", &pod());

        step().deploy(&ctx).await.unwrap();

        let verbs: Vec<Verb> = cluster.actions().await.iter().map(|a| a.verb).collect();
        assert_eq!(
            verbs,
            vec![
                Verb::Get,
                Verb::Delete,
                Verb::Get,
                Verb::Create,
                Verb::Watch,
                Verb::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_waits_for_previous_pod_to_terminate() {
        let (cluster, ctx) = setup();
        cluster.insert("ns", &pod());
        cluster.keep_deleted_for(3);

        fast_step(Duration::from_secs(5)).deploy(&ctx).await.unwrap();

        let verbs: Vec<Verb> = cluster.actions().await.iter().map(|a| a.verb).collect();
        assert_eq!(
            verbs,
            vec![
                Verb::Get,
                Verb::Delete,
                // Terminating for three gets, gone on the fourth
                Verb::Get,
                Verb::Get,
                Verb::Get,
                Verb::Get,
                Verb::Create,
                Verb::Watch,
                Verb::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_previous_pod_that_never_terminates() {
        let (cluster, ctx) = setup();
        cluster.insert("ns", &pod());
        cluster.keep_deleted_for(usize::MAX);

        let err = fast_step(Duration::from_millis(50)).deploy(&ctx).await.unwrap_err();

        assert!(matches!(err, DeploymentError::Timeout { .. }));
        assert!(cluster.actions_with(Verb::Create).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_pod() {
        let (cluster, ctx) = setup();
        cluster.script_watch(
            "migrate",
            WatchScript::phases("migrate", &[PodPhase::Pending, PodPhase::Running, PodPhase::Failed]),
        );

        let err = step().deploy(&ctx).await.unwrap_err();
        assert!(matches!(err, DeploymentError::SetupPodFailed(ref name) if name == "migrate"));
        // Left in place for inspection
        assert!(cluster.contains("ns", pod().reference()));
        assert_eq!(cluster.open_watches(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pod() {
        let (cluster, ctx) = setup();
        cluster.script_watch("migrate", WatchScript::phases("migrate", &[PodPhase::Unknown]));

        let err = step().deploy(&ctx).await.unwrap_err();
        assert!(matches!(err, DeploymentError::PodStateUnknown(_)));
    }

    #[tokio::test]
    async fn test_decode_failures_are_skipped() {
        let (cluster, ctx) = setup();
        cluster.script_watch(
            "migrate",
            WatchScript::default()
                .event(Ok(WatchEvent::Modified(json!("garbage"))))
                .event(Ok(WatchEvent::Error("too old resource version".into())))
                .event(Ok(WatchEvent::Modified(json!({
                    "kind": "Pod",
                    "spec": "not a pod spec",
                    "status": {"phase": "Succeeded"}
                })))),
        );

        step().deploy(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_decode_failures_are_bounded() {
        let (cluster, ctx) = setup();
        let mut script = WatchScript::default();
        for _ in 0..10 {
            script = script.event(Ok(WatchEvent::Modified(json!(42))));
        }
        cluster.script_watch("migrate", script.hang());

        let config = PodRunConfig {
            timeout: Duration::from_secs(30),
            max_decode_failures: 2,
            ..PodRunConfig::default()
        };
        let err = PodManifestStep::new("migrate", pod(), config)
            .unwrap()
            .deploy(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::PodDecode { failures: 3, .. }));
        assert_eq!(cluster.open_watches(), 0);
    }

    #[tokio::test]
    async fn test_timeout_closes_watch() {
        let (cluster, ctx) = setup();
        cluster.script_watch(
            "migrate",
            WatchScript::phases("migrate", &[PodPhase::Running]).hang(),
        );

        let config = PodRunConfig {
            timeout: Duration::from_millis(50),
            ..PodRunConfig::default()
        };
        let err = PodManifestStep::new("migrate", pod(), config)
            .unwrap()
            .deploy(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Timeout { .. }));
        assert_eq!(cluster.open_watches(), 0);
    }

    #[tokio::test]
    async fn test_watch_closed_early() {
        let (cluster, ctx) = setup();
        cluster.script_watch("migrate", WatchScript::phases("migrate", &[PodPhase::Pending]));

        let err = step().deploy(&ctx).await.unwrap_err();
        assert!(matches!(err, DeploymentError::WatchClosed(_)));
    }

    #[tokio::test]
    async fn test_create_failure_skips_watch() {
        let (cluster, ctx) = setup();
        cluster.fail_on(Verb::Create, ClusterError::Api("quota".into()));

        assert!(step().deploy(&ctx).await.is_err());
        assert!(cluster.actions_with(Verb::Watch).await.is_empty());
    }

    #[tokio::test]
    async fn test_watch_failure_aborts() {
        let (cluster, ctx) = setup();
        cluster.fail_on(Verb::Watch, ClusterError::Watch("connection reset".into()));

        let err = step().deploy(&ctx).await.unwrap_err();

        assert!(matches!(err, DeploymentError::Cluster(ClusterError::Watch(_))));
        assert!(cluster.contains("ns", pod().reference()));
        assert_eq!(cluster.open_watches(), 0);
        assert!(cluster.actions_with(Verb::Delete).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_failure_aborts_before_create() {
        let (cluster, ctx) = setup();
        cluster.fail_on(Verb::Get, ClusterError::Api("forbidden".into()));

        assert!(step().deploy(&ctx).await.is_err());
        assert_eq!(
            cluster.actions().await,
            vec![ClusterAction::new(Verb::Get, "Pod", "migrate")]
        );
    }

    #[tokio::test]
    async fn test_destroy_failure_is_returned() {
        let (cluster, ctx) = setup();
        cluster.insert("ns", &pod());
        cluster.fail_on(Verb::Delete, ClusterError::Api("forbidden".into()));

        let err = step().destroy(&ctx).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Cluster(ClusterError::Api(_))));
    }

    #[tokio::test]
    async fn test_destroy_absent_pod() {
        let (_, ctx) = setup();
        step().destroy(&ctx).await.unwrap();
    }
}
