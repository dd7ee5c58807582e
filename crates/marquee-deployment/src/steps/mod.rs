//! Step executors
//!
//! A step is one cluster object from one task. There are two kinds:
//!
//! - [`ManifestStep`]: create the object and move on
//! - [`PodManifestStep`]: run a pod to completion and clean it up

pub mod manifest;
pub mod pod;

pub use manifest::ManifestStep;
pub use pod::PodManifestStep;

use crate::context::StepContext;
use crate::error::Result;
use async_trait::async_trait;
use marquee_cluster::ClusterObject;
use std::fmt;

/// Deploy and destroy one cluster object
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn deploy(&self, ctx: &StepContext) -> Result<()>;

    /// Remove the object. An object that is already gone is not an error.
    async fn destroy(&self, ctx: &StepContext) -> Result<()>;

    /// The decoded object this step manages
    fn object(&self) -> &ClusterObject;

    /// Step kind for logging
    fn kind(&self) -> &'static str;
}

/// A step together with the task and manifest it came from
pub struct Step {
    task: String,
    manifest: String,
    executor: Box<dyn StepExecutor>,
}

impl Step {
    pub fn new(
        task: impl Into<String>,
        manifest: impl Into<String>,
        executor: Box<dyn StepExecutor>,
    ) -> Self {
        Self {
            task: task.into(),
            manifest: manifest.into(),
            executor,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    pub fn kind(&self) -> &'static str {
        self.executor.kind()
    }

    pub fn object(&self) -> &ClusterObject {
        self.executor.object()
    }

    pub async fn deploy(&self, ctx: &StepContext) -> Result<()> {
        self.executor.deploy(ctx).await
    }

    pub async fn destroy(&self, ctx: &StepContext) -> Result<()> {
        self.executor.destroy(ctx).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("task", &self.task)
            .field("manifest", &self.manifest)
            .field("kind", &self.kind())
            .field("object", &self.object().reference().to_string())
            .finish()
    }
}
