//! Marquee Cluster - Control-plane adapter
//!
//! Everything the deployment engine needs from the cluster goes through the
//! [`ClusterClient`] trait:
//!
//! - **create** a decoded object in a namespace
//! - **get** an object by kind and name
//! - **delete** an object by kind and name
//! - **watch** objects matching a field selector
//!
//! Manifests arrive as rendered YAML or JSON text and are decoded into a
//! kind-tagged [`ClusterObject`] before dispatch.
//!
//! ## Implementations
//!
//! - [`InMemoryCluster`]: records every call and replays scripted watch
//!   events. Used by tests and dry runs.
//! - `KubeClusterClient` (feature `kube`): talks to a real API server through
//!   `kube`'s dynamic object API.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod client;
pub mod error;
#[cfg(feature = "kube")]
pub mod kubernetes;
pub mod memory;
pub mod object;
pub mod pod;

// Re-exports
pub use client::{ClusterClient, WatchEvent, WatchStream};
pub use error::{ClusterError, Result};
#[cfg(feature = "kube")]
pub use kubernetes::KubeClusterClient;
pub use memory::{ClusterAction, InMemoryCluster, Verb, WatchScript};
pub use object::{ClusterObject, ObjectRef, ResourceKind};
pub use pod::{pod_phase, PodPhase, POD_API_VERSION, POD_KIND};
