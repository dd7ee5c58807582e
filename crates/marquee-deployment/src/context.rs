//! Step context
//!
//! What a step needs to touch the cluster. Steps never reach for the
//! cluster client on their own.

use marquee_cluster::ClusterClient;
use std::sync::Arc;

/// Cluster access shared by the steps of one deploy or destroy
#[derive(Clone)]
pub struct StepContext {
    pub cluster: Arc<dyn ClusterClient>,
    pub namespace: String,
}

impl StepContext {
    pub fn new(cluster: Arc<dyn ClusterClient>, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
        }
    }
}
