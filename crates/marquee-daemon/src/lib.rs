//! Marquee Daemon library
//!
//! Wiring between configuration and the deployment engine:
//! - Layered configuration (defaults, file, `MARQUEE_*` environment)
//! - [`App`], which loads the playbook catalog and manifests once and
//!   builds the services every command runs against

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod app;
pub mod config;
pub mod error;

pub use app::{parse_vars, App};
pub use config::{CatalogConfig, ClusterBackend, ClusterConfig, DaemonConfig, LoggingConfig, NotificationConfig};
pub use error::{DaemonError, DaemonResult};
