//! Step builder
//!
//! Turns a playbook plus instance variables into the ordered list of steps to
//! execute. Every manifest is rendered and decoded here, so template and
//! decode errors surface before any cluster call is made.

use crate::config::PodRunConfig;
use crate::error::{DeploymentError, Result};
use crate::steps::{ManifestStep, PodManifestStep, Step};
use marquee_cluster::ClusterObject;
use marquee_registry::ManifestSet;
use marquee_template::Manifest;
use marquee_types::{Playbook, TaskAction, Vars};
use tracing::debug;

/// A manifest rendered for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    pub task: String,
    pub manifest: String,
    /// Whether the task runs this manifest as a pod to completion
    pub run_pod: bool,
    pub text: String,
}

/// Build the steps for a playbook, in task order.
///
/// Tasks with a pod manifest yield one [`PodManifestStep`]; other tasks yield
/// one [`ManifestStep`] per listed manifest, duplicates included. The first
/// failure aborts the build.
pub fn build_steps(
    playbook: &Playbook,
    vars: &Vars,
    manifests: &ManifestSet,
    pod_config: PodRunConfig,
) -> Result<Vec<Step>> {
    check_references(playbook, manifests)?;

    let mut steps = Vec::new();
    for task in &playbook.tasks {
        match task.action() {
            TaskAction::RunPod(name) => {
                let object = decode(name, &render(playbook, &task.name, name, vars, manifests)?)?;
                let executor = PodManifestStep::new(name, object, pod_config)?;
                steps.push(Step::new(&task.name, name, Box::new(executor)));
            }
            TaskAction::Apply(names) => {
                for name in names {
                    let object =
                        decode(name, &render(playbook, &task.name, name, vars, manifests)?)?;
                    steps.push(Step::new(&task.name, name, Box::new(ManifestStep::new(object))));
                }
            }
        }
    }

    debug!(playbook_id = %playbook.id, steps = steps.len(), "Built steps");
    Ok(steps)
}

/// Render every manifest of a playbook without decoding it
pub fn render_manifests(
    playbook: &Playbook,
    vars: &Vars,
    manifests: &ManifestSet,
) -> Result<Vec<RenderedManifest>> {
    check_references(playbook, manifests)?;

    let mut rendered = Vec::new();
    for task in &playbook.tasks {
        let (names, run_pod): (Vec<&str>, bool) = match task.action() {
            TaskAction::RunPod(name) => (vec![name], true),
            TaskAction::Apply(names) => (names.iter().map(String::as_str).collect(), false),
        };
        for name in names {
            rendered.push(RenderedManifest {
                task: task.name.clone(),
                manifest: name.to_string(),
                run_pod,
                text: render(playbook, &task.name, name, vars, manifests)?,
            });
        }
    }
    Ok(rendered)
}

/// Every manifest a playbook references must exist before anything is
/// rendered
fn check_references(playbook: &Playbook, manifests: &ManifestSet) -> Result<()> {
    for task in &playbook.tasks {
        for name in task.referenced_manifests() {
            if !manifests.contains(name) {
                return Err(DeploymentError::ManifestNotFound {
                    playbook_id: playbook.id.clone(),
                    task: task.name.clone(),
                    manifest: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn lookup<'m>(
    playbook: &Playbook,
    task: &str,
    name: &str,
    manifests: &'m ManifestSet,
) -> Result<&'m Manifest> {
    manifests
        .get(name)
        .ok_or_else(|| DeploymentError::ManifestNotFound {
            playbook_id: playbook.id.clone(),
            task: task.to_string(),
            manifest: name.to_string(),
        })
}

fn render(
    playbook: &Playbook,
    task: &str,
    name: &str,
    vars: &Vars,
    manifests: &ManifestSet,
) -> Result<String> {
    Ok(lookup(playbook, task, name, manifests)?.render(vars)?)
}

fn decode(name: &str, text: &str) -> Result<ClusterObject> {
    ClusterObject::decode(text).map_err(|source| DeploymentError::Decode {
        manifest: name.to_string(),
        source,
    })
}
