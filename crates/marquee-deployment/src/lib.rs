//! Marquee Deployment Engine
//!
//! Deploys playbook instances to a cluster and tracks their status.
//!
//! ## Flow
//!
//! 1. [`InstanceService::create`] validates an instance against its playbook
//!    and stores it.
//! 2. [`DeploymentManager::deploy`] renders every manifest the playbook
//!    references, decodes them into [`Step`]s and runs the steps in order.
//! 3. [`DeploymentManager::destroy`] deletes each step's object, in
//!    playbook order.
//!
//! Status transitions are persisted through the
//! [`InstanceRepository`](marquee_registry::InstanceRepository) and published
//! on an [`EventPublisher`].
//!
//! ## Usage
//!
//! ```no_run
//! use marquee_cluster::InMemoryCluster;
//! use marquee_deployment::{DeploymentConfig, DeploymentManager, EventPublisher, InstanceService};
//! use marquee_notify::LogNotifier;
//! use marquee_registry::{InMemoryInstanceRepository, ManifestSet, PlaybookCatalog};
//! use marquee_types::Instance;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let playbooks = Arc::new(PlaybookCatalog::new());
//! let manifests = Arc::new(ManifestSet::new());
//! let repository = Arc::new(InMemoryInstanceRepository::new());
//! let notifier = Arc::new(LogNotifier);
//! let events = EventPublisher::new();
//!
//! let instances = InstanceService::new(
//!     playbooks.clone(),
//!     repository.clone(),
//!     notifier.clone(),
//!     events.clone(),
//! );
//! let manager = DeploymentManager::new(
//!     playbooks,
//!     manifests,
//!     repository,
//!     Arc::new(InMemoryCluster::new()),
//!     notifier,
//!     DeploymentConfig::default(),
//! )
//! .with_events(events);
//!
//! let mut instance = instances.create(Instance::new("web", "feature-1")).await?;
//! manager.deploy(&mut instance).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod instances;
pub mod manager;
pub mod steps;

// Re-exports
pub use builder::{build_steps, render_manifests, RenderedManifest};
pub use config::{DeploymentConfig, PersistencePolicy, PodRunConfig, WriteMode};
pub use context::StepContext;
pub use error::{DeploymentError, ErrorClass, Result};
pub use events::EventPublisher;
pub use instances::{declared_vars, InstanceService};
pub use manager::DeploymentManager;
pub use steps::{ManifestStep, PodManifestStep, Step, StepExecutor};
