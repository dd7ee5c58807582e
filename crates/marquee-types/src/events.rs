//! Instance lifecycle events
//!
//! Every status transition the orchestrator makes is published as an event so
//! that plugins and observers can react without polling the repository.

use crate::ids::InstanceKey;
use crate::instance::InstanceStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping instance events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Event severity
    pub severity: EventSeverity,

    /// Instance the event is about
    pub instance: InstanceKey,

    /// Instance status after the event
    pub status: InstanceStatus,

    /// The actual event
    pub event: InstanceEvent,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// Instance lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstanceEvent {
    /// Instance record created
    Created,

    /// Instance vars replaced
    Updated,

    /// Deploy accepted and marked in progress
    DeployStarted { steps: usize },

    /// One step finished
    StepCompleted { task: String, object: String },

    /// All steps deployed
    Deployed,

    /// A step failed during deploy
    DeployFailed { reason: String },

    /// Destroy accepted and marked in progress
    DestroyStarted { steps: usize },

    /// All steps destroyed
    Destroyed,

    /// A step failed during destroy
    DestroyFailed { reason: String },

    /// Instance record removed
    Deleted,
}

impl InstanceEventEnvelope {
    /// Create a new event envelope
    pub fn new(instance: InstanceKey, status: InstanceStatus, event: InstanceEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            severity: Self::infer_severity(&event),
            instance,
            status,
            event,
        }
    }

    fn infer_severity(event: &InstanceEvent) -> EventSeverity {
        match event {
            InstanceEvent::DeployFailed { .. } | InstanceEvent::DestroyFailed { .. } => {
                EventSeverity::Error
            }
            InstanceEvent::Deleted => EventSeverity::Warning,
            _ => EventSeverity::Info,
        }
    }
}
