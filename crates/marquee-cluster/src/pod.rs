//! Pod phase decoding
//!
//! Watch payloads are not guaranteed to arrive in the representation the
//! client expects. Decoding first tries the typed `v1` Pod shape and, if that
//! fails, converts the raw payload by reading `status.phase` directly.

use crate::error::{ClusterError, Result};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const POD_KIND: &str = "Pod";
pub const POD_API_VERSION: &str = "v1";

/// Lifecycle phase of a pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }

    /// Still waiting for the pod to finish
    pub fn is_active(&self) -> bool {
        matches!(self, PodPhase::Pending | PodPhase::Running)
    }

    fn parse(s: &str) -> Option<Self> {
        [
            PodPhase::Pending,
            PodPhase::Running,
            PodPhase::Succeeded,
            PodPhase::Failed,
            PodPhase::Unknown,
        ]
        .into_iter()
        .find(|phase| phase.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the phase of a pod from a watch payload.
///
/// A pod that has no status yet is reported as `Pending`.
pub fn pod_phase(payload: &Value) -> Result<PodPhase> {
    match serde_json::from_value::<Pod>(payload.clone()) {
        Ok(pod) => match pod.status.and_then(|status| status.phase) {
            None => Ok(PodPhase::Pending),
            Some(phase) => PodPhase::parse(&phase).map_or_else(|| convert(payload), Ok),
        },
        Err(e) => {
            tracing::debug!(error = %e, "Payload is not a typed pod, converting");
            convert(payload)
        }
    }
}

fn convert(payload: &Value) -> Result<PodPhase> {
    let Some(object) = payload.as_object() else {
        return Err(ClusterError::Decode("pod payload is not an object".to_string()));
    };

    if let Some(kind) = object.get("kind").and_then(Value::as_str) {
        if !kind.eq_ignore_ascii_case(POD_KIND) {
            return Err(ClusterError::Decode(format!("expected a Pod, got {}", kind)));
        }
    }

    match payload.pointer("/status/phase") {
        None | Some(Value::Null) => Ok(PodPhase::Pending),
        Some(Value::String(phase)) => PodPhase::parse(phase)
            .ok_or_else(|| ClusterError::Decode(format!("unrecognised pod phase {:?}", phase))),
        Some(other) => Err(ClusterError::Decode(format!(
            "pod phase must be a string, got {}",
            other
        ))),
    }
}
