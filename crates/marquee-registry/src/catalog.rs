//! Playbook catalog

use crate::error::{RegistryError, Result};
use crate::manifests::ManifestSet;
use marquee_types::Playbook;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Every playbook known to the process, keyed by ID
#[derive(Debug, Clone, Default)]
pub struct PlaybookCatalog {
    playbooks: BTreeMap<String, Arc<Playbook>>,
}

impl PlaybookCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, validating every playbook and rejecting duplicate IDs
    pub fn from_playbooks(playbooks: impl IntoIterator<Item = Playbook>) -> Result<Self> {
        let mut catalog = Self::new();
        for playbook in playbooks {
            catalog.insert(playbook)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, playbook: Playbook) -> Result<()> {
        playbook.validate()?;
        if self.playbooks.contains_key(&playbook.id) {
            return Err(RegistryError::DuplicatePlaybook(playbook.id));
        }
        self.playbooks.insert(playbook.id.clone(), Arc::new(playbook));
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<Playbook>> {
        self.playbooks.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.playbooks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Playbook> {
        self.playbooks.values().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.playbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }

    /// Check that every manifest referenced by every task exists
    pub fn check_references(&self, manifests: &ManifestSet) -> Result<()> {
        for playbook in self.iter() {
            for task in &playbook.tasks {
                for name in task.referenced_manifests() {
                    if !manifests.contains(name) {
                        return Err(RegistryError::UnknownManifest {
                            playbook_id: playbook.id.clone(),
                            task: task.name.clone(),
                            manifest: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_template::Manifest;
    use marquee_types::{PlaybookError, Task};

    fn playbook(id: &str, tasks: Vec<Task>) -> Playbook {
        Playbook {
            id: id.to_string(),
            name: format!("{} playbook", id),
            meta: Default::default(),
            vars: vec!["branch".into()],
            tasks,
            messages: Default::default(),
        }
    }

    #[test]
    fn test_lookup() {
        let catalog = PlaybookCatalog::from_playbooks(vec![
            playbook("web", vec![Task::apply("deploy", vec!["web".into()])]),
            playbook("api", vec![Task::run_pod("migrate", "migrate")]),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("web").unwrap().name, "web playbook");
        assert!(catalog.lookup("missing").is_none());
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["api", "web"]);
    }

    #[test]
    fn test_rejects_duplicates_and_invalid() {
        let err = PlaybookCatalog::from_playbooks(vec![
            playbook("web", vec![Task::apply("a", vec!["x".into()])]),
            playbook("web", vec![Task::apply("b", vec!["y".into()])]),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePlaybook(id) if id == "web"));

        let err = PlaybookCatalog::from_playbooks(vec![playbook("", vec![])]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidPlaybook(PlaybookError::MissingId)
        ));
    }

    #[test]
    fn test_check_references() {
        let catalog = PlaybookCatalog::from_playbooks(vec![playbook(
            "web",
            vec![Task::apply("deploy", vec!["svc".into(), "deployment".into()])],
        )])
        .unwrap();

        let mut manifests = ManifestSet::new();
        manifests
            .insert(Manifest::new("svc", "kind: Service").unwrap())
            .unwrap();

        let err = catalog.check_references(&manifests).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnknownManifest { ref manifest, .. } if manifest == "deployment"
        ));

        manifests
            .insert(Manifest::new("deployment", "kind: Deployment").unwrap())
            .unwrap();
        catalog.check_references(&manifests).unwrap();
    }
}
