//! Manifest set

use crate::error::{RegistryError, Result};
use marquee_template::Manifest;
use std::collections::BTreeMap;

/// Parsed manifest templates, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    manifests: BTreeMap<String, Manifest>,
}

impl ManifestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifests(manifests: impl IntoIterator<Item = Manifest>) -> Result<Self> {
        let mut set = Self::new();
        for manifest in manifests {
            set.insert(manifest)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, manifest: Manifest) -> Result<()> {
        if self.manifests.contains_key(manifest.name()) {
            return Err(RegistryError::DuplicateManifest(manifest.name().to_string()));
        }
        self.manifests.insert(manifest.name().to_string(), manifest);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Manifest> {
        self.manifests.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.manifests.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.manifests.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}
