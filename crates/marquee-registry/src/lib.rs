//! Marquee Registry - Playbooks, manifests and instance storage
//!
//! This crate provides:
//!
//! - **PlaybookCatalog**: every playbook known to the process, keyed by ID
//! - **ManifestSet**: parsed manifest templates, keyed by name
//! - **InstanceRepository**: persistence for instances
//!
//! The catalog and manifest set are loaded once at startup and are read-only
//! afterwards; share them with `Arc`.
//!
//! ## In-Memory vs Persistent
//!
//! [`InMemoryInstanceRepository`] is suitable for development, dry runs and
//! tests. Persistent backends implement the same trait.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod catalog;
pub mod error;
pub mod loader;
pub mod manifests;
pub mod memory;
pub mod repository;

// Re-exports
pub use catalog::PlaybookCatalog;
pub use error::{RegistryError, RepositoryError, Result};
pub use loader::{load, load_manifest_dir, load_playbook_dir};
pub use manifests::ManifestSet;
pub use memory::InMemoryInstanceRepository;
pub use repository::InstanceRepository;
