//! Plain manifest step: create on deploy, delete on destroy

use super::StepExecutor;
use crate::context::StepContext;
use crate::error::Result;
use async_trait::async_trait;
use marquee_cluster::ClusterObject;
use tracing::{debug, info};

/// Creates one object. Readiness is not checked.
#[derive(Debug, Clone)]
pub struct ManifestStep {
    object: ClusterObject,
}

impl ManifestStep {
    pub fn new(object: ClusterObject) -> Self {
        Self { object }
    }
}

#[async_trait]
impl StepExecutor for ManifestStep {
    async fn deploy(&self, ctx: &StepContext) -> Result<()> {
        ctx.cluster.create(&ctx.namespace, &self.object).await?;
        info!(object = %self.object.reference(), namespace = %ctx.namespace, "Created object");
        Ok(())
    }

    async fn destroy(&self, ctx: &StepContext) -> Result<()> {
        match ctx.cluster.delete(&ctx.namespace, self.object.reference()).await {
            Ok(()) => {
                info!(object = %self.object.reference(), "Deleted object");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(object = %self.object.reference(), "Object already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn object(&self) -> &ClusterObject {
        &self.object
    }

    fn kind(&self) -> &'static str {
        "manifest"
    }
}
