//! Marquee Types - Core types for playbook deployments
//!
//! Marquee deploys named *instances* of a *playbook* against a Kubernetes
//! cluster. This crate holds the data model shared by every other crate.
//!
//! ## Key Concepts
//!
//! - **Playbook**: ordered list of tasks describing what to deploy
//! - **Task**: one unit of work, either a set of manifests to apply or a
//!   single pod to run to completion
//! - **Instance**: one concrete deployment of a playbook, keyed by
//!   `(playbook_id, id)`
//! - **Message**: a notification sent to external channels
//! - **InstanceEvent**: a status transition published to subscribers

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod ids;
pub mod instance;
pub mod notification;
pub mod playbook;

// Re-export main types
pub use events::{EventSeverity, InstanceEvent, InstanceEventEnvelope};
pub use ids::{validate_instance_id, InstanceKey, InvalidInstanceId, MAX_INSTANCE_ID_LEN};
pub use instance::{Instance, InstanceStatus, Vars};
pub use notification::{Attachment, Message};
pub use playbook::{Playbook, PlaybookError, PlaybookMeta, Task, TaskAction};
