//! Load playbooks and manifests from disk
//!
//! Both directories are flat: every `*.yml` or `*.yaml` file is one playbook
//! or one manifest. A manifest's name is its file stem, so `web.yml` is
//! referenced from a task as `web`. Other files are ignored.

use crate::catalog::PlaybookCatalog;
use crate::error::{RegistryError, Result};
use crate::manifests::ManifestSet;
use marquee_template::Manifest;
use marquee_types::Playbook;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Load the playbook catalog and manifest set, checking that every manifest
/// a playbook references exists
pub fn load(playbook_dir: &Path, manifest_dir: &Path) -> Result<(PlaybookCatalog, ManifestSet)> {
    let catalog = load_playbook_dir(playbook_dir)?;
    let manifests = load_manifest_dir(manifest_dir)?;
    catalog.check_references(&manifests)?;

    info!(
        playbooks = catalog.len(),
        manifests = manifests.len(),
        "Loaded playbooks and manifests"
    );
    Ok((catalog, manifests))
}

/// Load every playbook file in a directory
pub fn load_playbook_dir(dir: &Path) -> Result<PlaybookCatalog> {
    let mut catalog = PlaybookCatalog::new();
    for path in yaml_files(dir)? {
        let text = read(&path)?;
        let playbook: Playbook =
            serde_yaml::from_str(&text).map_err(|e| RegistryError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
        debug!(playbook_id = %playbook.id, path = %path.display(), "Loaded playbook");
        catalog.insert(playbook)?;
    }
    Ok(catalog)
}

/// Load every manifest template in a directory
pub fn load_manifest_dir(dir: &Path) -> Result<ManifestSet> {
    let mut manifests = ManifestSet::new();
    for path in yaml_files(dir)? {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let text = read(&path)?;
        manifests.insert(Manifest::new(name, text)?)?;
        debug!(manifest = name, "Loaded manifest");
    }
    Ok(manifests)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// YAML files directly inside `dir`, sorted by path
fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| RegistryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext));
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
